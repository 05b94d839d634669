use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::scoring::Verdict;
use crate::storage::{atomic_write, lock_path, read_optional, with_exclusive_lock};

/// Running totals of past verdicts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterState {
    #[serde(default)]
    pub approved: u64,
    #[serde(default)]
    pub rejected: u64,
}

impl CounterState {
    /// Copy of the state with the counter matching `verdict` bumped by one.
    pub fn bumped(self, verdict: Verdict) -> Self {
        match verdict {
            Verdict::Approved => Self {
                approved: self.approved.saturating_add(1),
                ..self
            },
            Verdict::Rejected => Self {
                rejected: self.rejected.saturating_add(1),
                ..self
            },
        }
    }

    pub fn total(&self) -> u64 {
        self.approved.saturating_add(self.rejected)
    }
}

/// Durable verdict counters.
///
/// `increment` is a single read-modify-write transaction; implementations serialize it so
/// concurrent callers never lose an update. Calls may block on I/O.
pub trait CounterStore: Send + Sync {
    fn load(&self) -> Result<CounterState, PersistenceError>;
    fn save(&self, state: CounterState) -> Result<(), PersistenceError>;
    fn increment(&self, verdict: Verdict) -> Result<CounterState, PersistenceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("counter store at {} could not be accessed: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("counter store at {} holds a malformed document: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("counter store unavailable: {0}")]
    Unavailable(String),
}

/// JSON document `{"approved": n, "rejected": m}` stored at a fixed path.
///
/// Writers hold an exclusive lock on `<path>.lock`, so every store instance and process
/// pointed at the same file shares one serialized history. Readers see whole documents only.
#[derive(Debug)]
pub struct JsonFileCounterStore {
    path: PathBuf,
}

impl JsonFileCounterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn exclusive<T>(
        &self,
        operation: impl FnOnce() -> Result<T, PersistenceError>,
    ) -> Result<T, PersistenceError> {
        with_exclusive_lock(&self.path, operation).map_err(|source| PersistenceError::Io {
            path: lock_path(&self.path),
            source,
        })?
    }

    fn read_state(&self) -> Result<CounterState, PersistenceError> {
        let bytes = read_optional(&self.path).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })?;

        match bytes {
            None => Ok(CounterState::default()),
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Malformed {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    fn write_state(&self, state: CounterState) -> Result<(), PersistenceError> {
        let payload =
            serde_json::to_vec(&state).map_err(|source| PersistenceError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        atomic_write(&self.path, &payload).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl CounterStore for JsonFileCounterStore {
    fn load(&self) -> Result<CounterState, PersistenceError> {
        self.read_state()
    }

    fn save(&self, state: CounterState) -> Result<(), PersistenceError> {
        self.exclusive(|| self.write_state(state))
    }

    fn increment(&self, verdict: Verdict) -> Result<CounterState, PersistenceError> {
        self.exclusive(|| {
            let next = self.read_state()?.bumped(verdict);
            self.write_state(next)?;
            Ok(next)
        })
    }
}

/// Process-local counters, used by tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    state: Mutex<CounterState>,
}

impl InMemoryCounterStore {
    pub fn with_state(state: CounterState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    fn guard(&self) -> MutexGuard<'_, CounterState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CounterStore for InMemoryCounterStore {
    fn load(&self) -> Result<CounterState, PersistenceError> {
        Ok(*self.guard())
    }

    fn save(&self, state: CounterState) -> Result<(), PersistenceError> {
        *self.guard() = state;
        Ok(())
    }

    fn increment(&self, verdict: Verdict) -> Result<CounterState, PersistenceError> {
        let mut guard = self.guard();
        *guard = guard.bumped(verdict);
        Ok(*guard)
    }
}
