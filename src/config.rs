use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ServiceError;

/// Environment variables override file values, e.g. `REVIEWER_SERVER_PORT=9000`.
pub const ENV_PREFIX: &str = "REVIEWER";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://reviewer.db".to_string(),
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            max_connections: 5,
            busy_timeout_secs: 30,
            request_timeout_secs: 60,
            log_level: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional TOML file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ServiceError> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("database_url", defaults.database_url)
            .and_then(|b| b.set_default("server_host", defaults.server_host))
            .and_then(|b| b.set_default("server_port", defaults.server_port as i64))
            .and_then(|b| b.set_default("max_connections", defaults.max_connections as i64))
            .and_then(|b| b.set_default("busy_timeout_secs", defaults.busy_timeout_secs as i64))
            .and_then(|b| {
                b.set_default("request_timeout_secs", defaults.request_timeout_secs as i64)
            })
            .map_err(|e| ServiceError::ConfigError(e.to_string()))?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: AppConfig = builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ServiceError::ConfigError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.database_url.trim().is_empty() {
            return Err(ServiceError::ConfigError(
                "database_url cannot be empty".to_string(),
            ));
        }

        if self.server_port == 0 {
            return Err(ServiceError::ConfigError(
                "server_port must be non-zero".to_string(),
            ));
        }

        if self.max_connections == 0 {
            return Err(ServiceError::ConfigError(
                "max_connections must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
