use loan_desk::config::DecisionConfig;
use loan_desk::decision::{LinearScoringModel, ScoringAdapter};
use loan_desk::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Load the model artifact once; the adapter shares it read-only for the process lifetime.
pub(crate) fn load_scoring_adapter(config: &DecisionConfig) -> Result<ScoringAdapter, AppError> {
    let model = LinearScoringModel::from_path(&config.model_path)?;
    info!(
        model_path = %config.model_path.display(),
        timeout_ms = config.scoring_timeout.as_millis() as u64,
        "scoring model loaded"
    );
    Ok(ScoringAdapter::new(Arc::new(model), config.scoring_timeout))
}

/// Parse a `name=value` CLI pair.
pub(crate) fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
