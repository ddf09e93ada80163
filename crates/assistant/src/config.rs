//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL for the sheet store.
    pub database_url: String,
    /// `account=token` pairs for linked calendars, if any.
    pub calendar_tokens: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `ASSISTANT_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `SQLITE_PATH` | SQLite database URL | `sqlite:assistant.db?mode=rwc` |
    /// | `GOOGLE_CALENDAR_TOKENS` | `account=token,...` | (none) |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("ASSISTANT_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("SQLITE_PATH")
            .unwrap_or_else(|_| "sqlite:assistant.db?mode=rwc".to_string());

        let calendar_tokens = env::var("GOOGLE_CALENDAR_TOKENS")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(Self {
            addr,
            database_url,
            calendar_tokens,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid ASSISTANT_ADDR format")]
    InvalidAddr,
}
