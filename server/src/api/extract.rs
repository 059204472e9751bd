//! Request extractors.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};

use super::handlers::run_blocking;
use super::{ApiError, AppState};
use crate::auth::SessionIdentity;

/// The authenticated caller of a protected route.
///
/// Rejects the request with 401 unless it carries a valid
/// `Authorization: Bearer <token>` header for a user that still exists.
/// The store lookup runs on the blocking pool, since a registration may hold
/// the store's write lock across a file sync.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionIdentity);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or(ApiError::Unauthenticated)?
            .to_string();
        let gateway = Arc::clone(&state.gateway);
        let identity = run_blocking(move || gateway.resolve(&token)).await?;
        Ok(Self(identity))
    }
}

/// Extract the token from an `Authorization: Bearer` header.
///
/// The scheme is matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
