//! Error types for the logkeep server.

use std::net::SocketAddr;

use logkeep_core::LogError;
use thiserror::Error;

/// Errors that can occur while configuring or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failed to bind to the specified address.
    #[error("failed to bind to {0}: {1}")]
    Bind(SocketAddr, std::io::Error),

    /// I/O error outside of binding.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the log service.
    #[error(transparent)]
    Log(#[from] LogError),
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn bind_error_display() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8082);
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let msg = ServerError::Bind(addr, io_err).to_string();
        assert!(msg.contains("127.0.0.1:8082"));
        assert!(msg.contains("address in use"));
    }

    #[test]
    fn log_error_is_transparent() {
        let err: ServerError = LogError::NotFound("7".to_string()).into();
        assert_eq!(err.to_string(), "record 7 not found in store");
    }

    #[test]
    fn config_error_display() {
        let err = ServerError::Config("service name cannot be empty".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: service name cannot be empty"
        );
    }
}
