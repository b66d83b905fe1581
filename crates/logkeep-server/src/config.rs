//! Server configuration.
//!
//! Loaded from a JSON file; any field may be omitted and falls back to its
//! default. The binary applies environment and command-line overrides on top
//! through the `with_*` builders.

use std::net::SocketAddr;
use std::path::Path;

use logkeep_core::{DEFAULT_SERVICE_NAME, MAX_SERVICE_NAME_LEN};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Default HTTP listen address.
pub const DEFAULT_BIND_ADDR: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED),
    8082,
);

/// Default size of the database connection pool.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Default capacity of the ingestion queue channel.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Configuration for the logkeep server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP API listens on.
    pub bind_addr: SocketAddr,
    /// PostgreSQL connection URL. Without one, only in-memory mode works.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    pub max_connections: u32,
    /// Name stamped on records the service writes itself.
    pub service_name: String,
    /// Whether `DELETE /logs?truncate=true` is honoured.
    pub allow_truncate: bool,
    /// Capacity of the ingestion queue channel.
    pub queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR,
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            allow_truncate: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ServerError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or fails validation.
    pub fn from_json(content: &str) -> ServerResult<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| ServerError::Config(format!("invalid JSON: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> ServerResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ServerError::Config(format!("failed to serialize config: {e}")))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> ServerResult<()> {
        if self.service_name.is_empty() {
            return Err(ServerError::Config(
                "service name cannot be empty".to_string(),
            ));
        }

        if self.service_name.chars().count() > MAX_SERVICE_NAME_LEN {
            return Err(ServerError::Config(format!(
                "service name cannot exceed {MAX_SERVICE_NAME_LEN} characters"
            )));
        }

        if self.max_connections == 0 {
            return Err(ServerError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }

        if self.queue_capacity == 0 {
            return Err(ServerError::Config(
                "queue_capacity must be at least 1".to_string(),
            ));
        }

        if let Some(ref url) = self.database_url {
            if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                return Err(ServerError::Config(
                    "database_url must be a postgres:// or postgresql:// URL".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Set the listen address.
    #[must_use]
    pub const fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the database URL.
    #[must_use]
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    /// Set the connection pool size.
    #[must_use]
    pub const fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Enable or disable truncation over HTTP.
    #[must_use]
    pub const fn with_allow_truncate(mut self, allow: bool) -> Self {
        self.allow_truncate = allow;
        self
    }

    /// Set the ingestion queue capacity.
    #[must_use]
    pub const fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}
