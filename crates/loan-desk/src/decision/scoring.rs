use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::features::{FeatureVector, FEATURE_COUNT};

/// Binary outcome of a loan decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    Rejected,
}

impl Verdict {
    /// Interpret a classifier label; only `1` and `0` are meaningful.
    pub fn from_label(label: i64) -> Result<Self, ScoringError> {
        match label {
            1 => Ok(Verdict::Approved),
            0 => Ok(Verdict::Rejected),
            other => Err(ScoringError::UnexpectedLabel(other)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Approved => "approved",
            Verdict::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Scaler and classifier pair that turns a feature vector into a 0/1 label.
///
/// Implementations are loaded once at start-up and shared read-only across requests.
pub trait ScoringCapability: Send + Sync {
    fn scale(&self, features: &[f64; FEATURE_COUNT]) -> Result<[f64; FEATURE_COUNT], ScoringError>;
    fn predict(&self, scaled: &[f64; FEATURE_COUNT]) -> Result<i64, ScoringError>;
}

/// Failure of the scoring capability or of its output contract.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("scoring model returned unexpected label {0}")]
    UnexpectedLabel(i64),
    #[error("scoring model failed: {0}")]
    Capability(String),
    #[error("scoring model did not respond within {0:?}")]
    TimedOut(Duration),
}

/// Wraps a [`ScoringCapability`] and maps its raw label onto a [`Verdict`].
#[derive(Clone)]
pub struct ScoringAdapter {
    capability: Arc<dyn ScoringCapability>,
    timeout: Duration,
}

impl ScoringAdapter {
    pub fn new(capability: Arc<dyn ScoringCapability>, timeout: Duration) -> Self {
        Self {
            capability,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Score on the calling thread.
    pub fn score(&self, vector: &FeatureVector) -> Result<Verdict, ScoringError> {
        score_with(self.capability.as_ref(), vector)
    }

    /// Score on the blocking pool, giving up once the configured timeout elapses.
    pub async fn score_bounded(&self, vector: FeatureVector) -> Result<Verdict, ScoringError> {
        let capability = Arc::clone(&self.capability);
        let task = tokio::task::spawn_blocking(move || score_with(capability.as_ref(), &vector));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(ScoringError::Capability(join_error.to_string())),
            Err(_) => Err(ScoringError::TimedOut(self.timeout)),
        }
    }
}

fn score_with(
    capability: &dyn ScoringCapability,
    vector: &FeatureVector,
) -> Result<Verdict, ScoringError> {
    let scaled = capability.scale(vector.as_array())?;
    let label = capability.predict(&scaled)?;
    Verdict::from_label(label)
}
