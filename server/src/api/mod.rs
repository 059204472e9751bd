//! HTTP surface.
//!
//! Routes:
//! - `POST /token`: exchange email and password for a bearer token
//! - `POST /register`: set the first password of an allow-listed user
//! - `GET /me`: the caller's identity
//! - `GET /metrics`: filtered, sorted, paginated and redacted metrics
//! - `GET /health`: liveness probe

mod error;
mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::http::header::InvalidHeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

pub use error::ApiError;
pub use extract::CurrentUser;

use crate::auth::{AuthGateway, PasswordHasher, TokenError, TokenService};
use crate::clock::SystemClock;
use crate::config::ServerConfig;
use crate::metrics::{MetricsEngine, MetricsTable, TableError};
use crate::users::{CsvUserFile, StoreError, UserStore};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub gateway: Arc<AuthGateway>,
    pub metrics: MetricsEngine,
}

/// Error returned when the application cannot be assembled.
#[derive(Debug)]
pub enum StartupError {
    Users(StoreError),
    Metrics(TableError),
    Token(TokenError),
}

impl std::fmt::Display for StartupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Users(e) => write!(f, "failed to load users: {e}"),
            Self::Metrics(e) => write!(f, "failed to load metrics: {e}"),
            Self::Token(e) => write!(f, "failed to configure tokens: {e}"),
        }
    }
}

impl std::error::Error for StartupError {}

impl AppState {
    #[must_use]
    pub const fn new(gateway: Arc<AuthGateway>, metrics: MetricsEngine) -> Self {
        Self { gateway, metrics }
    }

    /// Load both tables from the configured data directory and wire up the
    /// gateway and query engine.
    ///
    /// # Errors
    ///
    /// Returns an error if either table fails to load or the secret is unusable.
    pub fn from_config(config: &ServerConfig) -> Result<Self, StartupError> {
        let users = UserStore::open(Box::new(CsvUserFile::new(config.users_path())))
            .map_err(StartupError::Users)?;
        tracing::info!(
            "loaded {} allow-listed users from {}",
            users.len().map_err(StartupError::Users)?,
            config.users_path().display()
        );

        let table = MetricsTable::load_csv(&config.metrics_path()).map_err(StartupError::Metrics)?;

        let tokens = TokenService::new(config.secret_key.as_bytes(), Arc::new(SystemClock))
            .map_err(StartupError::Token)?;
        let gateway = AuthGateway::new(
            Arc::new(users),
            PasswordHasher::default(),
            tokens,
            config.token_ttl(),
        );

        Ok(Self::new(
            Arc::new(gateway),
            MetricsEngine::new(Arc::new(table)),
        ))
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/token", post(handlers::login))
        .route("/register", post(handlers::register))
        .route("/me", get(handlers::me))
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// CORS policy for browser clients on `origins`.
///
/// Credentials are allowed, so methods and headers mirror the preflight
/// request instead of using a wildcard.
///
/// # Errors
///
/// Returns an error if an origin is not a valid header value.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, InvalidHeaderValue> {
    let origins = origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}
