use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{atomic_write, lock_path, read_optional, with_exclusive_lock};

/// Credential record for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Storage abstraction so the auth service can be exercised in isolation.
pub trait AccountStore: Send + Sync {
    fn insert(&self, account: Account) -> Result<Account, AccountStoreError>;
    fn fetch(&self, username: &str) -> Result<Option<Account>, AccountStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AccountStoreError {
    #[error("account already exists")]
    Conflict,
    #[error("account store at {} could not be accessed: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("account store at {} holds a malformed document: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Accounts kept as one JSON object keyed by username. Inserts hold `<path>.lock`.
#[derive(Debug)]
pub struct JsonFileAccountStore {
    path: PathBuf,
}

impl JsonFileAccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, Account>, AccountStoreError> {
        let bytes = read_optional(&self.path).map_err(|source| AccountStoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        match bytes {
            None => Ok(BTreeMap::new()),
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| AccountStoreError::Malformed {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    fn write_all(&self, accounts: &BTreeMap<String, Account>) -> Result<(), AccountStoreError> {
        let payload = serde_json::to_vec_pretty(accounts).map_err(|source| {
            AccountStoreError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        atomic_write(&self.path, &payload).map_err(|source| AccountStoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl AccountStore for JsonFileAccountStore {
    fn insert(&self, account: Account) -> Result<Account, AccountStoreError> {
        with_exclusive_lock(&self.path, || {
            let mut accounts = self.read_all()?;
            if accounts.contains_key(&account.username) {
                return Err(AccountStoreError::Conflict);
            }
            accounts.insert(account.username.clone(), account.clone());
            self.write_all(&accounts)?;
            Ok(account)
        })
        .map_err(|source| AccountStoreError::Io {
            path: lock_path(&self.path),
            source,
        })?
    }

    fn fetch(&self, username: &str) -> Result<Option<Account>, AccountStoreError> {
        Ok(self.read_all()?.remove(username))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: Mutex<BTreeMap<String, Account>>,
}

impl AccountStore for InMemoryAccountStore {
    fn insert(&self, account: Account) -> Result<Account, AccountStoreError> {
        let mut guard = self
            .accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.contains_key(&account.username) {
            return Err(AccountStoreError::Conflict);
        }
        guard.insert(account.username.clone(), account.clone());
        Ok(account)
    }

    fn fetch(&self, username: &str) -> Result<Option<Account>, AccountStoreError> {
        let guard = self
            .accounts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(guard.get(username).cloned())
    }
}
