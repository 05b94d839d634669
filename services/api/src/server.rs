use crate::cli::ServeArgs;
use crate::infra::{load_scoring_adapter, AppState};
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use loan_desk::auth::{AuthService, JsonFileAccountStore};
use loan_desk::config::AppConfig;
use loan_desk::decision::{DecisionService, JsonFileCounterStore};
use loan_desk::error::AppError;
use loan_desk::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let scoring = load_scoring_adapter(&config.decision)?;
    let counters = Arc::new(JsonFileCounterStore::new(&config.decision.counters_path));
    let decisions = Arc::new(DecisionService::new(scoring, counters));
    let accounts = Arc::new(JsonFileAccountStore::new(&config.auth.accounts_path));
    let auth = Arc::new(AuthService::new(accounts));

    let app = with_service_routes(decisions, auth)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        counters_path = %config.decision.counters_path.display(),
        "loan decision service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
