use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::{Extension, Json};
use std::sync::Arc;
use tower::ServiceExt;

use super::common::*;
use crate::auth::AuthenticatedUser;
use crate::decision::router::{decide_handler, decision_router, COUNTERS_PERSISTED_HEADER};
use crate::decision::service::DecisionService;
use crate::decision::{CounterState, CounterStore, InMemoryCounterStore, JsonFileCounterStore};

fn officer() -> Extension<AuthenticatedUser> {
    Extension(AuthenticatedUser {
        username: "officer".to_string(),
    })
}

fn decision_request(token: Option<&str>, body: serde_json::Value) -> Request<axum::body::Body> {
    let mut builder = Request::post("/api/v1/decisions")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(axum::body::Body::from(
            serde_json::to_vec(&body).expect("serializes"),
        ))
        .expect("request builds")
}

#[tokio::test]
async fn decide_handler_returns_bad_request_for_invalid_input() {
    let (service, counters) = build_service();
    let mut raw = strong_applicant();
    raw.insert("credit_score", "");

    let response = decide_handler(State(Arc::new(service)), officer(), Ok(Json(raw))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("credit_score"));
    assert_eq!(counters.load().expect("loads").total(), 0);
}

#[tokio::test]
async fn decide_handler_returns_unavailable_for_scoring_errors() {
    let counters = Arc::new(InMemoryCounterStore::default());
    let service = DecisionService::new(adapter(FixedLabelModel(5)), counters);

    let response =
        decide_handler(State(Arc::new(service)), officer(), Ok(Json(strong_applicant()))).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .starts_with("prediction error"));
}

#[tokio::test]
async fn decide_handler_flags_unpersisted_counters() {
    let service = DecisionService::new(
        adapter(CreditThresholdModel),
        Arc::new(ReadOnlyCounters(CounterState::default())),
    );

    let response =
        decide_handler(State(Arc::new(service)), officer(), Ok(Json(strong_applicant()))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(COUNTERS_PERSISTED_HEADER)
            .and_then(|value| value.to_str().ok()),
        Some("false")
    );
    let payload = read_json_body(response).await;
    assert_eq!(payload["verdict"], "approved");
}

#[tokio::test]
async fn decision_route_requires_a_session() {
    let (service, counters) = build_service();
    let router = decision_router(Arc::new(service), auth_service());

    let response = router
        .oneshot(decision_request(
            None,
            serde_json::to_value(strong_applicant()).expect("json"),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(counters.load().expect("loads").total(), 0);
}

#[tokio::test]
async fn decision_route_rejects_unknown_tokens() {
    let (service, _) = build_service();
    let router = decision_router(Arc::new(service), auth_service());

    let response = router
        .oneshot(decision_request(
            Some("not-a-session"),
            serde_json::to_value(strong_applicant()).expect("json"),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn decision_route_scores_authenticated_requests() {
    let (service, _) = build_service();
    let auth = auth_service();
    let token = signed_in(&auth);
    let router = decision_router(Arc::new(service), auth);

    let response = router
        .oneshot(decision_request(
            Some(&token),
            serde_json::json!({
                "income": 1500,
                "coapplicant_income": 0,
                "loan_amount": 100000,
                "loan_term": 360,
                "credit_score": 620,
                "dependents": 2,
                "gender": 0,
                "married": 0,
                "education": 1,
                "self_employed": 0,
                "property_area": 1
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(COUNTERS_PERSISTED_HEADER)
            .and_then(|value| value.to_str().ok()),
        Some("true")
    );
    let payload = read_json_body(response).await;
    assert_eq!(payload["verdict"], "rejected");
    assert_eq!(payload["reason"], "Income is below acceptable threshold.");
    assert_eq!(payload["estimated_time"], "2-4 months");
    assert_eq!(payload["approved_count"], 0);
    assert_eq!(payload["rejected_count"], 1);
}

#[tokio::test]
async fn stats_route_reports_counters() {
    let (service, _) = build_service();
    let auth = auth_service();
    let token = signed_in(&auth);
    let service = Arc::new(service);
    service
        .decide(&strong_applicant())
        .await
        .expect("decision succeeds");
    let router = decision_router(service, auth);

    let response = router
        .oneshot(
            Request::get("/api/v1/decisions/stats")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(axum::body::Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["approved_count"], 1);
    assert_eq!(payload["rejected_count"], 0);
}

#[tokio::test]
async fn decision_route_answers_form_bodies_with_a_json_error() {
    let (service, counters) = build_service();
    let auth = auth_service();
    let token = signed_in(&auth);
    let router = decision_router(Arc::new(service), auth);

    let response = router
        .oneshot(
            Request::post("/api/v1/decisions")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(axum::body::Body::from("income=5000&credit_score=700"))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .starts_with("invalid request body"));
    assert_eq!(counters.load().expect("loads").total(), 0);
}

#[tokio::test]
async fn decision_route_answers_non_object_json_with_a_json_error() {
    let (service, counters) = build_service();
    let auth = auth_service();
    let token = signed_in(&auth);
    let router = decision_router(Arc::new(service), auth);

    let response = router
        .oneshot(decision_request(Some(&token), serde_json::json!([1, 2])))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json_body(response).await;
    assert!(payload["error"].is_string());
    assert_eq!(counters.load().expect("loads").total(), 0);
}

#[tokio::test]
async fn stats_route_reports_unreadable_counters_as_json() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("prediction_counts.json");
    std::fs::write(&path, b"{approved: lots}").expect("seed file");
    let service = DecisionService::new(
        adapter(CreditThresholdModel),
        Arc::new(JsonFileCounterStore::new(&path)),
    );
    let auth = auth_service();
    let token = signed_in(&auth);
    let router = decision_router(Arc::new(service), auth);

    let response = router
        .oneshot(
            Request::get("/api/v1/decisions/stats")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(axum::body::Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .starts_with("persistence error"));
}
