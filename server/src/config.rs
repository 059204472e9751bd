//! Server configuration module.
//!
//! This module provides configuration loading for the metrics server from
//! environment variables. A `.env` file in the working directory supplies
//! values for variables the process environment does not set.
//!
//! # Environment Variables
//!
//! - `SECRET_KEY`: HMAC secret used to sign access tokens (default: `changeme123`).
//!   The default is insecure and exists only so a local checkout starts; every
//!   deployment must override it.
//! - `ACCESS_TOKEN_EXPIRE_MINUTES`: Access token lifetime in minutes (default: `60`)
//! - `METRICS_DATA_DIRECTORY`: Directory holding `users.csv` and `metrics.csv` (default: `./data`)
//! - `METRICS_LISTEN_PORT`: Port to listen on (default: `8000`)
//! - `METRICS_ALLOWED_ORIGINS`: Comma-separated CORS origins
//!   (default: `http://localhost:5173,http://localhost:3000,http://localhost`)
//!
//! # Invariants
//!
//! - `secret_key` is never empty
//! - `access_token_expire_minutes` is always at least 1

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Secret used to sign and verify access tokens.
    pub secret_key: String,
    /// Access token lifetime in minutes.
    pub access_token_expire_minutes: u64,
    /// Directory containing the users and metrics tables.
    pub data_directory: PathBuf,
    /// Port to listen on for HTTP connections.
    pub listen_port: u16,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
    /// The `.env` file exists but cannot be read or parsed.
    DotenvFile { path: PathBuf, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
            Self::DotenvFile { path, message } => {
                write!(f, "failed to read {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Fallback signing secret. Insecure; deployments must set `SECRET_KEY`.
    pub const DEFAULT_SECRET_KEY: &'static str = "changeme123";
    /// Default token lifetime in minutes.
    pub const DEFAULT_TOKEN_EXPIRE_MINUTES: u64 = 60;
    /// Default data directory.
    pub const DEFAULT_DATA_DIRECTORY: &'static str = "./data";
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 8000;
    /// Default CORS origins (local frontend dev servers).
    pub const DEFAULT_ALLOWED_ORIGINS: [&'static str; 3] = [
        "http://localhost:5173",
        "http://localhost:3000",
        "http://localhost",
    ];

    /// Dotenv file read by [`ServerConfig::from_env`].
    pub const DOTENV_FILE: &'static str = ".env";

    /// Load configuration from the process environment, falling back to
    /// `./.env` for unset variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to a value that cannot be used,
    /// or if `.env` exists but is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup_and_dotenv(|name| std::env::var(name).ok(), Path::new(Self::DOTENV_FILE))
    }

    /// Load configuration through `lookup`, with `dotenv` supplying values
    /// `lookup` does not have. A missing dotenv file is not an error.
    ///
    /// The file is read into memory; the process environment is never modified.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value is unusable.
    pub fn from_lookup_and_dotenv<F>(lookup: F, dotenv: &Path) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_values = read_dotenv(dotenv)?;
        if !file_values.is_empty() {
            tracing::debug!("read {} values from {}", file_values.len(), dotenv.display());
        }
        Self::from_lookup(|name| lookup(name).or_else(|| file_values.get(name).cloned()))
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unset and empty variables both fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `ACCESS_TOKEN_EXPIRE_MINUTES` is not a positive integer
    /// - `METRICS_LISTEN_PORT` is not a valid port number
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let secret_key =
            lookup("SECRET_KEY").unwrap_or_else(|| Self::DEFAULT_SECRET_KEY.to_string());
        let access_token_expire_minutes =
            Self::parse_expire_minutes(lookup("ACCESS_TOKEN_EXPIRE_MINUTES"))?;
        let data_directory = lookup("METRICS_DATA_DIRECTORY")
            .map_or_else(|| PathBuf::from(Self::DEFAULT_DATA_DIRECTORY), PathBuf::from);
        let listen_port = Self::parse_listen_port(lookup("METRICS_LISTEN_PORT"))?;
        let allowed_origins = lookup("METRICS_ALLOWED_ORIGINS").map_or_else(
            || {
                Self::DEFAULT_ALLOWED_ORIGINS
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            },
            |value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(ToString::to_string)
                    .collect()
            },
        );

        Ok(Self {
            secret_key,
            access_token_expire_minutes,
            data_directory,
            listen_port,
            allowed_origins,
        })
    }

    /// Whether the insecure fallback secret is in use.
    #[must_use]
    pub fn uses_default_secret(&self) -> bool {
        self.secret_key == Self::DEFAULT_SECRET_KEY
    }

    /// Lifetime of issued access tokens.
    #[must_use]
    pub const fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_expire_minutes.saturating_mul(60))
    }

    #[must_use]
    pub fn users_path(&self) -> PathBuf {
        self.data_directory.join("users.csv")
    }

    #[must_use]
    pub fn metrics_path(&self) -> PathBuf {
        self.data_directory.join("metrics.csv")
    }

    fn parse_expire_minutes(value: Option<String>) -> Result<u64, ConfigError> {
        let Some(value) = value else {
            return Ok(Self::DEFAULT_TOKEN_EXPIRE_MINUTES);
        };
        match value.trim().parse::<u64>() {
            Ok(minutes) if minutes > 0 => Ok(minutes),
            _ => Err(ConfigError::InvalidValue {
                name: "ACCESS_TOKEN_EXPIRE_MINUTES".to_string(),
                message: format!("'{value}' is not a positive number of minutes"),
            }),
        }
    }

    fn parse_listen_port(value: Option<String>) -> Result<u16, ConfigError> {
        let Some(value) = value else {
            return Ok(Self::DEFAULT_PORT);
        };
        value
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue {
                name: "METRICS_LISTEN_PORT".to_string(),
                message: format!("'{value}' is not a valid port number (must be 1-65535)"),
            })
    }
}

fn read_dotenv(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let error = |e: &dotenvy::Error| ConfigError::DotenvFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    match dotenvy::from_path_iter(path) {
        Ok(entries) => entries
            .collect::<Result<HashMap<_, _>, _>>()
            .map_err(|e| error(&e)),
        Err(e) if e.not_found() => Ok(HashMap::new()),
        Err(e) => Err(error(&e)),
    }
}
