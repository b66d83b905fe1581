//! # logkeep-core
//!
//! Log record model, validation and persistence for logkeep.
//!
//! This crate provides:
//!
//! - [`LogRecord`] / [`LogRow`]: the wire and storage shapes of a log entry
//! - [`validate_wire_shaped`] / [`validate_storage_shaped`]: aggregated field rules
//! - [`LogFilter`]: listing criteria
//! - [`LogRecordStore`]: abstract store, with [`MemoryLogStore`] and [`PgLogStore`]
//! - [`LogService`]: list, lookup, create and delete over a store
//! - [`QueueConsumer`]: queue ingestion with diagnostic records for failures
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use logkeep_core::{DeleteRequest, LogFilter, LogService, MemoryLogStore};
//! use serde_json::json;
//!
//! # tokio_test_block_on(async {
//! let service = LogService::new(Arc::new(MemoryLogStore::new()));
//!
//! let created = service
//!     .create(&json!({"logLevel": "INFO", "logCategory": "system", "message": "File uploaded."}))
//!     .await?;
//! assert_eq!(created.id, Some(1));
//!
//! let infos = service.list(&LogFilter::new().with_level("INFO")).await?;
//! assert_eq!(infos.len(), 1);
//!
//! service.delete(DeleteRequest::single(1)).await?;
//! # Ok::<(), logkeep_core::LogError>(())
//! # }).expect("example");
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().expect("runtime").block_on(f)
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod filter;
pub mod ingest;
pub mod pg;
pub mod record;
pub mod service;
pub mod store;
pub mod traits;
pub mod validate;

// Re-export main types
pub use error::{ErrorKind, LogError, Result};
pub use filter::LogFilter;
pub use ingest::{
    failure_record, queue_channel, IngestOutcome, IngestStats, QueueConsumer, QueueSender,
    INGESTION_ERROR_CATEGORY, UNKNOWN_SERVICE,
};
pub use pg::PgLogStore;
pub use record::{from_storage, to_storage, LogRecord, LogRow};
pub use service::{
    DeleteOutcome, DeleteRequest, LogService, DEFAULT_HEALTH_CHECK_MESSAGE, DEFAULT_SERVICE_NAME,
    HEALTH_CHECK_CATEGORY,
};
pub use store::{MemoryLogStore, INITIAL_ID};
pub use traits::LogRecordStore;
pub use validate::{
    validate_storage_shaped, validate_wire_shaped, Field, Shape, MAX_SERVICE_NAME_LEN,
};
