//! Loan decision engine.
//!
//! Raw applicant fields are normalised into a [`FeatureVector`], scored by a
//! [`ScoringCapability`], explained when rejected, and counted in a [`CounterStore`].

pub mod counters;
pub mod features;
pub mod model;
pub mod reasoning;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use counters::{
    CounterState, CounterStore, InMemoryCounterStore, JsonFileCounterStore, PersistenceError,
};
pub use features::{build, FeatureField, FeatureVector, InvalidInputError, RawFields};
pub use model::{LinearScoringModel, LogisticClassifier, ModelLoadError, StandardScaler};
pub use reasoning::{explain, matching_rule, RejectionExplanation, RejectionRule};
pub use router::{decision_router, COUNTERS_PERSISTED_HEADER};
pub use scoring::{ScoringAdapter, ScoringCapability, ScoringError, Verdict};
pub use service::{DecisionError, DecisionOutcome, DecisionResult, DecisionService, DecisionView};
