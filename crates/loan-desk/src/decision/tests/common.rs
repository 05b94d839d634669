use std::sync::Arc;
use std::time::Duration;

use axum::response::Response;
use serde_json::Value;

use crate::auth::{AuthService, Credentials, InMemoryAccountStore};
use crate::decision::counters::{CounterState, CounterStore, PersistenceError};
use crate::decision::features::{FeatureField, RawFields, FEATURE_COUNT};
use crate::decision::scoring::{ScoringAdapter, ScoringCapability, ScoringError, Verdict};
use crate::decision::service::DecisionService;
use crate::decision::InMemoryCounterStore;

pub(super) fn applicant(income: f64, loan_amount: f64, credit_score: f64) -> RawFields {
    let mut raw = RawFields::new();
    raw.insert("income", income.to_string());
    raw.insert("coapplicant_income", "1500");
    raw.insert("loan_amount", loan_amount.to_string());
    raw.insert("loan_term", "360");
    raw.insert("credit_score", credit_score.to_string());
    raw.insert("dependents", "1");
    raw.insert("gender", "1");
    raw.insert("married", "1");
    raw.insert("education", "1");
    raw.insert("self_employed", "0");
    raw.insert("property_area", "2");
    raw
}

pub(super) fn strong_applicant() -> RawFields {
    applicant(8000.0, 120000.0, 760.0)
}

pub(super) fn weak_applicant() -> RawFields {
    applicant(5000.0, 100000.0, 550.0)
}

/// Approves when the raw credit score reaches 650; the scaler is the identity.
pub(super) struct CreditThresholdModel;

impl ScoringCapability for CreditThresholdModel {
    fn scale(&self, features: &[f64; FEATURE_COUNT]) -> Result<[f64; FEATURE_COUNT], ScoringError> {
        Ok(*features)
    }

    fn predict(&self, scaled: &[f64; FEATURE_COUNT]) -> Result<i64, ScoringError> {
        Ok(i64::from(
            scaled[FeatureField::CreditScore.index()] >= 650.0,
        ))
    }
}

/// Always returns the same label, whatever it is.
pub(super) struct FixedLabelModel(pub i64);

impl ScoringCapability for FixedLabelModel {
    fn scale(&self, features: &[f64; FEATURE_COUNT]) -> Result<[f64; FEATURE_COUNT], ScoringError> {
        Ok(*features)
    }

    fn predict(&self, _scaled: &[f64; FEATURE_COUNT]) -> Result<i64, ScoringError> {
        Ok(self.0)
    }
}

pub(super) struct SlowModel(pub Duration);

impl ScoringCapability for SlowModel {
    fn scale(&self, features: &[f64; FEATURE_COUNT]) -> Result<[f64; FEATURE_COUNT], ScoringError> {
        std::thread::sleep(self.0);
        Ok(*features)
    }

    fn predict(&self, _scaled: &[f64; FEATURE_COUNT]) -> Result<i64, ScoringError> {
        Ok(1)
    }
}

pub(super) struct BrokenScaler;

impl ScoringCapability for BrokenScaler {
    fn scale(&self, _features: &[f64; FEATURE_COUNT]) -> Result<[f64; FEATURE_COUNT], ScoringError> {
        Err(ScoringError::Capability("scaler not fitted".to_string()))
    }

    fn predict(&self, _scaled: &[f64; FEATURE_COUNT]) -> Result<i64, ScoringError> {
        Ok(1)
    }
}

/// Loads fine but can never write.
pub(super) struct ReadOnlyCounters(pub CounterState);

impl CounterStore for ReadOnlyCounters {
    fn load(&self) -> Result<CounterState, PersistenceError> {
        Ok(self.0)
    }

    fn save(&self, _state: CounterState) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable("read only".to_string()))
    }

    fn increment(&self, _verdict: Verdict) -> Result<CounterState, PersistenceError> {
        Err(PersistenceError::Unavailable("read only".to_string()))
    }
}

pub(super) fn adapter(capability: impl ScoringCapability + 'static) -> ScoringAdapter {
    ScoringAdapter::new(Arc::new(capability), Duration::from_secs(5))
}

pub(super) fn build_service() -> (
    DecisionService<InMemoryCounterStore>,
    Arc<InMemoryCounterStore>,
) {
    let counters = Arc::new(InMemoryCounterStore::default());
    let service = DecisionService::new(adapter(CreditThresholdModel), counters.clone());
    (service, counters)
}

pub(super) fn auth_service() -> Arc<AuthService<InMemoryAccountStore>> {
    Arc::new(AuthService::new(Arc::new(InMemoryAccountStore::default())))
}

/// Register and log in a user, returning the bearer token.
pub(super) fn signed_in(auth: &AuthService<InMemoryAccountStore>) -> String {
    let credentials = Credentials {
        username: "officer".to_string(),
        password: "hunter22".to_string(),
    };
    auth.register(credentials.clone()).expect("registers");
    auth.login(credentials).expect("logs in").token
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
