//! Route handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Form, Query, State};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState, CurrentUser};
use crate::auth::{AuthError, SessionIdentity};
use crate::metrics::{MetricsQuery, QueryResult};

/// OAuth2 password-flow form. `username` carries the email.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterParams {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub msg: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `POST /token`
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let gateway = Arc::clone(&state.gateway);
    let access_token =
        run_blocking(move || gateway.authenticate(&form.username, &form.password)).await?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// `POST /register?email=...&password=...`
pub async fn register(
    State(state): State<AppState>,
    Query(params): Query<RegisterParams>,
) -> Result<Json<MessageResponse>, ApiError> {
    let gateway = Arc::clone(&state.gateway);
    run_blocking(move || gateway.register(&params.email, &params.password)).await?;

    Ok(Json(MessageResponse { msg: "registered" }))
}

/// `GET /me`
pub async fn me(CurrentUser(identity): CurrentUser) -> Json<SessionIdentity> {
    Json(identity)
}

/// `GET /metrics`
pub async fn metrics(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<QueryResult>, ApiError> {
    let result = state.metrics.query(&query, identity.role.capabilities())?;
    Ok(Json(result))
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Run work that hashes passwords or takes the user store lock off the
/// async executor.
pub(super) async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
        .map_err(ApiError::from)
}
