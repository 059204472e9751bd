// Forbid unwrap() in production code to prevent panics from corrupt data.
// Test code is allowed to use unwrap() for convenience.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::net::SocketAddr;

use metrics_server::api::{self, AppState};
use metrics_server::config::ServerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metrics_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: data_directory={}, listen_port={}, token_ttl={}m",
        config.data_directory.display(),
        config.listen_port,
        config.access_token_expire_minutes
    );
    if config.uses_default_secret() {
        tracing::warn!("SECRET_KEY is not set; tokens are signed with the default development key");
    }

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to start: {e}");
            std::process::exit(1);
        }
    };

    let cors = match api::cors_layer(&config.allowed_origins) {
        Ok(cors) => cors,
        Err(e) => {
            tracing::error!("Invalid allowed origin: {e}");
            std::process::exit(1);
        }
    };

    let app = api::router(state).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    });
}
