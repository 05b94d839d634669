use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use super::counters::{CounterState, CounterStore, PersistenceError};
use super::features::{build, FeatureVector, InvalidInputError, RawFields};
use super::reasoning::{explain, RejectionExplanation};
use super::scoring::{ScoringAdapter, ScoringError, Verdict};

/// Orchestrates one decision: build, score, explain, count.
pub struct DecisionService<C> {
    scoring: ScoringAdapter,
    counters: Arc<C>,
}

impl<C> DecisionService<C>
where
    C: CounterStore + 'static,
{
    pub fn new(scoring: ScoringAdapter, counters: Arc<C>) -> Self {
        Self { scoring, counters }
    }

    /// Decide a request, running the model under the scoring timeout and the counter update
    /// on the blocking pool.
    pub async fn decide(&self, raw: &RawFields) -> Result<DecisionOutcome, DecisionError> {
        let vector = build(raw)?;
        let verdict = self.scoring.score_bounded(vector).await?;

        let counters = Arc::clone(&self.counters);
        let counted = tokio::task::spawn_blocking(move || count(counters.as_ref(), verdict))
            .await
            .unwrap_or_else(|err| {
                let err = PersistenceError::Unavailable(format!("counter update aborted: {err}"));
                error!(error = %err, %verdict, "failed to persist verdict counters");
                (CounterState::default(), Some(err))
            });

        Ok(outcome(&vector, verdict, counted))
    }

    /// Decide a request on the calling thread. Used by the CLI where no runtime is needed.
    pub fn decide_blocking(&self, raw: &RawFields) -> Result<DecisionOutcome, DecisionError> {
        let vector = build(raw)?;
        let verdict = self.scoring.score(&vector)?;
        let counted = count(self.counters.as_ref(), verdict);
        Ok(outcome(&vector, verdict, counted))
    }

    /// Current counters, read on the blocking pool.
    pub async fn counters_snapshot(&self) -> Result<CounterState, PersistenceError> {
        let counters = Arc::clone(&self.counters);
        tokio::task::spawn_blocking(move || counters.load())
            .await
            .map_err(|err| PersistenceError::Unavailable(format!("counter read aborted: {err}")))?
    }
}

fn count<C>(counters: &C, verdict: Verdict) -> (CounterState, Option<PersistenceError>)
where
    C: CounterStore + ?Sized,
{
    match counters.increment(verdict) {
        Ok(state) => (state, None),
        Err(err) => {
            error!(error = %err, %verdict, "failed to persist verdict counters");
            (counters.load().unwrap_or_default(), Some(err))
        }
    }
}

fn outcome(
    vector: &FeatureVector,
    verdict: Verdict,
    (counters, persistence_error): (CounterState, Option<PersistenceError>),
) -> DecisionOutcome {
    let explanation = match verdict {
        Verdict::Rejected => Some(explain(vector)),
        Verdict::Approved => None,
    };

    info!(
        %verdict,
        approved = counters.approved,
        rejected = counters.rejected,
        "loan decision recorded"
    );

    DecisionOutcome {
        result: DecisionResult {
            verdict,
            explanation,
            counters,
        },
        persistence_error,
    }
}

/// Verdict, optional explanation, and counters after the verdict was counted.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionResult {
    pub verdict: Verdict,
    pub explanation: Option<RejectionExplanation>,
    pub counters: CounterState,
}

impl DecisionResult {
    pub fn view(&self) -> DecisionView {
        let (reason, tip, estimated_time) = match &self.explanation {
            Some(explanation) => (
                Some(explanation.reason.clone()),
                Some(explanation.tip.clone()),
                Some(explanation.estimated_time.clone()),
            ),
            None => (None, None, None),
        };

        DecisionView {
            verdict: self.verdict,
            reason,
            tip,
            estimated_time,
            approved_count: self.counters.approved,
            rejected_count: self.counters.rejected,
        }
    }
}

/// A decision plus any failure to persist the counters, which never withholds the verdict.
#[derive(Debug)]
pub struct DecisionOutcome {
    pub result: DecisionResult,
    pub persistence_error: Option<PersistenceError>,
}

/// Flattened response payload for HTTP and CLI callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionView {
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    pub approved_count: u64,
    pub rejected_count: u64,
}

/// Failures that abort a decision before any counter is touched.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}
