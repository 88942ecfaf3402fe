//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Base URL of the hosted data/auth backend, e.g. `https://xyz.supabase.co`.
    pub gateway_url: reqwest::Url,
    /// The backend's public API key, sent with every request.
    pub gateway_anon_key: String,
    pub log_level: Level,
    /// Origin allowed by the CORS layer (the browser shell).
    pub allowed_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let gateway_url_str = std::env::var("GATEWAY_URL")
            .map_err(|_| ConfigError::MissingVar("GATEWAY_URL".to_string()))?;
        let gateway_url = gateway_url_str
            .parse::<reqwest::Url>()
            .map_err(|e| ConfigError::InvalidValue("GATEWAY_URL".to_string(), e.to_string()))?;

        let gateway_anon_key = std::env::var("GATEWAY_ANON_KEY")
            .map_err(|_| ConfigError::MissingVar("GATEWAY_ANON_KEY".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin = std::env::var("ALLOWED_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            gateway_url,
            gateway_anon_key,
            log_level,
            allowed_origin,
        })
    }
}
