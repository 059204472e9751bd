//! Mapping of domain errors onto HTTP responses.
//!
//! Bodies are `{"detail": "..."}`. Internal failures are logged in full and
//! answered with a generic message.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::auth::{AuthError, RegistrationRejection};
use crate::metrics::QueryError;

const UNAUTHENTICATED_DETAIL: &str = "Could not validate credentials";
const INVALID_CREDENTIALS_DETAIL: &str = "Incorrect email or password";
const INTERNAL_DETAIL: &str = "Internal server error";

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
}

/// Error returned by a request handler.
#[derive(Debug)]
pub enum ApiError {
    /// 401: missing, invalid or expired bearer token.
    Unauthenticated,
    /// 400: login failed.
    InvalidCredentials,
    /// 400: registration refused.
    RegistrationRejected(RegistrationRejection),
    /// 400: the metrics query is invalid.
    BadQuery(QueryError),
    /// 500: something failed on our side.
    Internal(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => f.write_str(UNAUTHENTICATED_DETAIL),
            Self::InvalidCredentials => f.write_str(INVALID_CREDENTIALS_DETAIL),
            Self::RegistrationRejected(reason) => f.write_str(reason.message()),
            Self::BadQuery(e) => write!(f, "{e}"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InvalidCredentials | Self::RegistrationRejected(_) | Self::BadQuery(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Unauthenticated => Self::Unauthenticated,
            AuthError::InvalidCredentials => Self::InvalidCredentials,
            AuthError::RegistrationRejected(reason) => Self::RegistrationRejected(reason),
            AuthError::Storage(_) | AuthError::Hashing(_) | AuthError::TokenIssue(_) => {
                Self::Internal(error.to_string())
            }
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(error: QueryError) -> Self {
        Self::BadQuery(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            Self::Internal(message) => {
                tracing::error!("request failed: {message}");
                INTERNAL_DETAIL.to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(ErrorBody { detail: &detail })).into_response();
        if matches!(self, Self::Unauthenticated) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
