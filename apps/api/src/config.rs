//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::time::Duration;

use mercantil_db::DbConfig;
use serde::{Deserialize, Serialize};

/// API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Upper bound of pooled connections
    pub database_max_connections: u32,

    /// How long a statement waits on a locked database
    pub database_busy_timeout_secs: u64,

    /// Shared secret of the HS256 bearer tokens
    pub jwt_secret: String,

    /// Include diagnostic detail in 500 responses
    pub expose_error_details: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            port: 8080,
            database_path: "./mercantil.db".to_string(),
            database_max_connections: 5,
            database_busy_timeout_secs: 5,
            jwt_secret: "mercantil-dev-secret-change-in-production".to_string(),
            expose_error_details: false,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ApiConfig::default();

        let config = ApiConfig {
            port: parse_or(&lookup, "API_PORT", defaults.port)?,

            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),

            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,

            database_busy_timeout_secs: parse_or(
                &lookup,
                "DATABASE_BUSY_TIMEOUT_SECS",
                defaults.database_busy_timeout_secs,
            )?,

            // In production this MUST be set via environment variable
            jwt_secret: lookup("JWT_SECRET").unwrap_or(defaults.jwt_secret),

            expose_error_details: parse_or(
                &lookup,
                "API_EXPOSE_ERROR_DETAILS",
                defaults.expose_error_details,
            )?,
        };

        if config.database_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS".to_string()));
        }
        if config.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }

        Ok(config)
    }

    /// Pool configuration for this API.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.database_max_connections)
            .busy_timeout(Duration::from_secs(self.database_busy_timeout_secs))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
