//! Queue message ingestion.
//!
//! Every payload handed over by the queue collaborator ends in a stored
//! record: either the record it describes, or a diagnostic record built from
//! the failure. Only a failure to store the diagnostic itself is dropped, and
//! that is reported through `tracing`.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::{LogError, Result};
use crate::record::{LogRecord, LogRow};
use crate::service::LogService;
use crate::traits::LogRecordStore;

/// Category of diagnostic records written for failed messages.
pub const INGESTION_ERROR_CATEGORY: &str = "QUEUE_CONSUMPTION_ERROR";

/// Service name used on diagnostic records when none is known.
pub const UNKNOWN_SERVICE: &str = "UNKNOWN";

/// What happened to one queue message.
#[derive(Debug)]
pub enum IngestOutcome {
    /// The message was a valid record and was stored.
    Stored(LogRecord),
    /// The message failed; a diagnostic record was stored instead.
    FailureLogged {
        /// Why the message was rejected.
        error: LogError,
        /// The stored diagnostic record.
        diagnostic: LogRecord,
    },
    /// The message failed and so did storing the diagnostic record.
    Dropped {
        /// Why the message was rejected.
        error: LogError,
        /// Why the diagnostic could not be stored.
        diagnostic_error: LogError,
    },
}

impl IngestOutcome {
    /// Returns true if the message itself was stored.
    #[must_use]
    pub const fn is_stored(&self) -> bool {
        matches!(self, Self::Stored(_))
    }
}

/// Builds the diagnostic row for a failed message.
///
/// The row goes through storage-shaped validation like any other row.
///
/// # Errors
///
/// Returns a validation error if `service_name` is longer than a service
/// name column allows.
pub fn failure_record(service_name: Option<&str>, payload: &str, error: &LogError) -> Result<LogRow> {
    let service = service_name
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_SERVICE);
    let now = Utc::now().to_rfc3339();

    LogRow::from_storage_value(&json!({
        "log_level": "ERROR",
        "log_category": INGESTION_ERROR_CATEGORY,
        "created_timestamp": now,
        "logged_at_timestamp": now,
        "message_id": Uuid::new_v4().to_string(),
        "publishing_service_name": service,
        "consuming_service_name": service,
        "message": format!("Error occurred: {error}, Context: {payload}"),
    }))
}

impl<S: LogRecordStore> LogService<S> {
    /// Ingests one raw queue payload. Never fails.
    pub async fn ingest(&self, payload: &[u8]) -> IngestOutcome {
        match self.ingest_payload(payload).await {
            Ok(record) => IngestOutcome::Stored(record),
            Err(error) => self.log_ingestion_failure(payload, error).await,
        }
    }

    async fn ingest_payload(&self, payload: &[u8]) -> Result<LogRecord> {
        let text = std::str::from_utf8(payload)?;
        let value: serde_json::Value = serde_json::from_str(text)?;
        self.create(&value).await
    }

    /// Stores a diagnostic record describing `error`.
    ///
    /// A failure here is logged and returned in the outcome, never retried.
    pub async fn log_ingestion_failure(&self, payload: &[u8], error: LogError) -> IngestOutcome {
        warn!(%error, "failed to ingest queue message");

        let context = String::from_utf8_lossy(payload);
        let stored = match failure_record(Some(self.service_name()), &context, &error) {
            Ok(row) => self.persist(row).await,
            Err(e) => Err(e),
        };

        match stored {
            Ok(diagnostic) => IngestOutcome::FailureLogged { error, diagnostic },
            Err(diagnostic_error) => {
                error!(
                    %error,
                    %diagnostic_error,
                    "failed to store ingestion failure record"
                );
                IngestOutcome::Dropped {
                    error,
                    diagnostic_error,
                }
            }
        }
    }
}

/// Sending half of a queue channel.
pub type QueueSender = mpsc::Sender<Vec<u8>>;

/// Creates a bounded channel for raw queue payloads.
#[must_use]
pub fn queue_channel(capacity: usize) -> (QueueSender, mpsc::Receiver<Vec<u8>>) {
    mpsc::channel(capacity.max(1))
}

/// Counters for a [`QueueConsumer`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Messages stored as records.
    pub stored: u64,
    /// Messages replaced by a diagnostic record.
    pub failures_logged: u64,
    /// Messages for which nothing could be stored.
    pub dropped: u64,
}

impl IngestStats {
    fn record(&mut self, outcome: &IngestOutcome) {
        match outcome {
            IngestOutcome::Stored(_) => self.stored += 1,
            IngestOutcome::FailureLogged { .. } => self.failures_logged += 1,
            IngestOutcome::Dropped { .. } => self.dropped += 1,
        }
    }

    /// Total messages seen.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.stored + self.failures_logged + self.dropped
    }
}

/// Drains a queue channel into a [`LogService`], one message at a time.
pub struct QueueConsumer<S> {
    service: Arc<LogService<S>>,
    receiver: mpsc::Receiver<Vec<u8>>,
}

impl<S: LogRecordStore> QueueConsumer<S> {
    /// Creates a consumer reading from `receiver`.
    #[must_use]
    pub const fn new(service: Arc<LogService<S>>, receiver: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { service, receiver }
    }

    /// Runs until every sender is dropped and the channel is drained.
    pub async fn run(mut self) -> IngestStats {
        let mut stats = IngestStats::default();

        while let Some(payload) = self.receiver.recv().await {
            let outcome = self.service.ingest(&payload).await;
            stats.record(&outcome);
        }

        info!(
            stored = stats.stored,
            failures_logged = stats.failures_logged,
            dropped = stats.dropped,
            "queue consumer finished"
        );
        stats
    }
}
