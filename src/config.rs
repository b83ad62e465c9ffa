//! Server configuration.
//!
//! Defaults can be overridden from the environment:
//!
//! | Variable             | Default     |
//! |----------------------|-------------|
//! | `PROCWIRE_HOST`      | `0.0.0.0`   |
//! | `PROCWIRE_PORT`      | `3000`      |
//! | `PROCWIRE_ENDPOINT`  | `/api/trpc` |
//! | `PROCWIRE_MAX_BATCH` | `64`        |

use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;
use tracing::info;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default RPC endpoint path.
pub const DEFAULT_ENDPOINT: &str = "/api/trpc";

/// Default maximum number of invocations in one batch request.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 64;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {key}: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Path the RPC endpoint is mounted at.
    pub endpoint: String,
    /// Largest accepted batch.
    pub max_batch_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl ServerConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the bind port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the endpoint path.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the batch limit.
    pub fn with_max_batch_size(mut self, limit: usize) -> Self {
        self.max_batch_size = limit;
        self
    }

    /// `host:port` to bind to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check the values.
    ///
    /// The endpoint must start with `/`, must not end with `/` and must not
    /// collide with `/health`. The batch limit must be at least 1.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid("host", "must not be empty"));
        }
        if !self.endpoint.starts_with('/') || self.endpoint.len() < 2 {
            return Err(ConfigError::invalid(
                "endpoint",
                "must start with '/' and name a path",
            ));
        }
        if self.endpoint.ends_with('/') {
            return Err(ConfigError::invalid("endpoint", "must not end with '/'"));
        }
        if self.endpoint == "/health" {
            return Err(ConfigError::invalid("endpoint", "'/health' is reserved"));
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::invalid("max_batch_size", "must be at least 1"));
        }
        Ok(())
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            host: load(&lookup, "PROCWIRE_HOST", defaults.host)?,
            port: load(&lookup, "PROCWIRE_PORT", defaults.port)?,
            endpoint: load(&lookup, "PROCWIRE_ENDPOINT", defaults.endpoint)?,
            max_batch_size: load(&lookup, "PROCWIRE_MAX_BATCH", defaults.max_batch_size)?,
        };

        config.validate()?;
        Ok(config)
    }
}

fn load<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid(key, format!("{raw:?}: {e}"))),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
