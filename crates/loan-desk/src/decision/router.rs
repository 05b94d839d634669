use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Router,
};
use serde_json::json;
use tracing::debug;

use super::counters::CounterStore;
use super::features::RawFields;
use super::service::{DecisionError, DecisionService};
use crate::auth::{require_session, AccountStore, AuthService, AuthenticatedUser};
use crate::error::AppError;

/// Response header set to `false` when the verdict was returned but its counter was not saved.
pub const COUNTERS_PERSISTED_HEADER: &str = "x-counters-persisted";

/// Router builder exposing the decision endpoint behind the session check.
pub fn decision_router<C, S>(
    service: Arc<DecisionService<C>>,
    auth: Arc<AuthService<S>>,
) -> Router
where
    C: CounterStore + 'static,
    S: AccountStore + 'static,
{
    Router::new()
        .route("/api/v1/decisions", post(decide_handler::<C>))
        .route("/api/v1/decisions/stats", get(stats_handler::<C>))
        .route_layer(middleware::from_fn_with_state(auth, require_session::<S>))
        .with_state(service)
}

pub(crate) async fn decide_handler<C>(
    State(service): State<Arc<DecisionService<C>>>,
    Extension(user): Extension<AuthenticatedUser>,
    body: Result<axum::Json<RawFields>, JsonRejection>,
) -> Response
where
    C: CounterStore + 'static,
{
    debug!(username = %user.username, "decision requested");
    let axum::Json(raw) = match body {
        Ok(body) => body,
        Err(rejection) => return AppError::from(rejection).into_response(),
    };

    match service.decide(&raw).await {
        Ok(outcome) => {
            let persisted = outcome.persistence_error.is_none();
            let mut response =
                (StatusCode::OK, axum::Json(outcome.result.view())).into_response();
            response.headers_mut().insert(
                HeaderName::from_static(COUNTERS_PERSISTED_HEADER),
                HeaderValue::from_static(if persisted { "true" } else { "false" }),
            );
            response
        }
        Err(DecisionError::InvalidInput(error)) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        Err(DecisionError::Scoring(error)) => {
            let payload = json!({
                "error": format!("prediction error: {error}"),
            });
            (StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn stats_handler<C>(
    State(service): State<Arc<DecisionService<C>>>,
) -> Result<axum::Json<serde_json::Value>, AppError>
where
    C: CounterStore + 'static,
{
    let state = service.counters_snapshot().await?;
    Ok(axum::Json(json!({
        "approved_count": state.approved,
        "rejected_count": state.rejected,
    })))
}
