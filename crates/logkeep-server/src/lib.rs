//! # logkeep-server
//!
//! HTTP API and queue ingestion front-end for [`logkeep_core`].
//!
//! - [`ServerConfig`]: JSON configuration with builder overrides
//! - [`http::dispatch`] / [`http::serve`]: the `/logs` API over hyper
//! - [`ServerError`]: startup and transport errors

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod http;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use http::{ApiOptions, ApiResponse};

impl From<&ServerConfig> for ApiOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            allow_truncate: config.allow_truncate,
        }
    }
}
