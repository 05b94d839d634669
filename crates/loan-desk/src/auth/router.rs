use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;

use super::accounts::AccountStore;
use super::service::{AuthError, AuthService, Credentials};
use super::sessions::SESSION_COOKIE;
use crate::error::AppError;

/// Router builder exposing registration, login, and logout.
pub fn auth_router<S>(service: Arc<AuthService<S>>) -> Router
where
    S: AccountStore + 'static,
{
    Router::new()
        .route("/api/v1/auth/register", post(register_handler::<S>))
        .route("/api/v1/auth/login", post(login_handler::<S>))
        .route("/api/v1/auth/logout", post(logout_handler::<S>))
        .with_state(service)
}

pub(crate) async fn register_handler<S>(
    State(service): State<Arc<AuthService<S>>>,
    body: Result<axum::Json<Credentials>, JsonRejection>,
) -> Response
where
    S: AccountStore + 'static,
{
    let axum::Json(credentials) = match body {
        Ok(body) => body,
        Err(rejection) => return AppError::from(rejection).into_response(),
    };

    let registered = tokio::task::spawn_blocking(move || service.register(credentials))
        .await
        .unwrap_or_else(|err| Err(AuthError::Worker(err.to_string())));

    match registered {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(error) => auth_error_response(error),
    }
}

pub(crate) async fn login_handler<S>(
    State(service): State<Arc<AuthService<S>>>,
    body: Result<axum::Json<Credentials>, JsonRejection>,
) -> Response
where
    S: AccountStore + 'static,
{
    let axum::Json(credentials) = match body {
        Ok(body) => body,
        Err(rejection) => return AppError::from(rejection).into_response(),
    };

    let logged_in = tokio::task::spawn_blocking(move || service.login(credentials))
        .await
        .unwrap_or_else(|err| Err(AuthError::Worker(err.to_string())));

    match logged_in {
        Ok(session) => {
            let payload = json!({
                "token": session.token,
                "username": session.username,
            });
            let mut response = (StatusCode::OK, axum::Json(payload)).into_response();
            let cookie = format!(
                "{SESSION_COOKIE}={}; HttpOnly; Path=/; SameSite=Lax",
                session.token
            );
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            response
        }
        Err(error) => auth_error_response(error),
    }
}

pub(crate) async fn logout_handler<S>(
    State(service): State<Arc<AuthService<S>>>,
    headers: HeaderMap,
) -> Response
where
    S: AccountStore + 'static,
{
    if let Some(token) = session_token(&headers) {
        service.logout(&token);
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    let cleared = format!("{SESSION_COOKIE}=; Max-Age=0; Path=/");
    if let Ok(value) = HeaderValue::from_str(&cleared) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

/// Middleware that admits only requests carrying a live session token.
///
/// The resolved [`AuthenticatedUser`](super::AuthenticatedUser) is stored in the request
/// extensions for downstream handlers.
pub async fn require_session<S>(
    State(service): State<Arc<AuthService<S>>>,
    mut request: Request,
    next: Next,
) -> Response
where
    S: AccountStore + 'static,
{
    let user = session_token(request.headers())
        .ok_or(AuthError::Unauthenticated)
        .and_then(|token| service.authenticate(&token));

    match user {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(error) => auth_error_response(error),
    }
}

/// Token from `Authorization: Bearer ...`, falling back to the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn auth_error_response(error: AuthError) -> Response {
    let status = match &error {
        AuthError::MissingCredentials => StatusCode::BAD_REQUEST,
        AuthError::UsernameTaken => StatusCode::CONFLICT,
        AuthError::InvalidCredentials | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
        AuthError::Hashing(_) | AuthError::Store(_) | AuthError::Worker(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
