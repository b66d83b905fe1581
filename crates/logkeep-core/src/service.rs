//! The log persistence service.
//!
//! [`LogService`] validates and maps records around calls to a
//! [`LogRecordStore`]. It holds no state of its own besides the store handle,
//! takes no locks and opens no transactions: concurrent deletes race with
//! concurrent creates and reads at the store's isolation level, and the last
//! write wins.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{LogError, Result};
use crate::filter::LogFilter;
use crate::record::{from_storage, to_storage, LogRecord, LogRow};
use crate::traits::LogRecordStore;

/// Service name used when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "logkeep";

/// Category of records written by [`LogService::record_health_check`].
pub const HEALTH_CHECK_CATEGORY: &str = "HEALTH_CHECK";

/// Message used by [`LogService::record_health_check`] when none is given.
pub const DEFAULT_HEALTH_CHECK_MESSAGE: &str =
    "No message provided, this is a default test log entry.";

/// Arguments of [`LogService::delete`].
///
/// Modes are evaluated in priority order: `truncate`, then a missing
/// `start_id` (rejected), then a range if `end_id` is set, else a single id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    /// Single id, or the inclusive lower bound of a range.
    #[serde(default)]
    pub start_id: Option<i64>,
    /// Inclusive upper bound of a range; must exceed `start_id`.
    #[serde(default)]
    pub end_id: Option<i64>,
    /// Erase every record and reset the identity sequence.
    #[serde(default)]
    pub truncate: bool,
}

impl DeleteRequest {
    /// Deletes the record with `id`.
    #[must_use]
    pub const fn single(id: i64) -> Self {
        Self {
            start_id: Some(id),
            end_id: None,
            truncate: false,
        }
    }

    /// Deletes every record with an id in `start..=end`.
    #[must_use]
    pub const fn range(start: i64, end: i64) -> Self {
        Self {
            start_id: Some(start),
            end_id: Some(end),
            truncate: false,
        }
    }

    /// Erases every record.
    #[must_use]
    pub const fn truncate_all() -> Self {
        Self {
            start_id: None,
            end_id: None,
            truncate: true,
        }
    }
}

/// Result of a successful [`LogService::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Rows were deleted by id or range.
    Deleted(u64),
    /// The whole store was truncated.
    Truncated,
}

/// Validating persistence service over a [`LogRecordStore`].
#[derive(Debug)]
pub struct LogService<S> {
    store: S,
    service_name: String,
}

impl<S: LogRecordStore> LogService<S> {
    /// Creates a service over `store`.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }

    /// Sets the name this service stamps on records it writes itself.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Returns the configured service name.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Lists every record matching `filter`.
    ///
    /// Order is whatever the store returns. No match is an empty list.
    pub async fn list(&self, filter: &LogFilter) -> Result<Vec<LogRecord>> {
        let rows = self.store.select(filter).await?;
        debug!(count = rows.len(), "listed log records");
        Ok(rows.into_iter().map(from_storage).collect())
    }

    /// Fetches a record by id.
    ///
    /// The id is taken as given. Anything that does not name an existing row,
    /// including text that is not an integer, yields [`LogError::NotFound`].
    pub async fn get_by_id(&self, id: impl ToString) -> Result<LogRecord> {
        let key = id.to_string();
        let row = match key.parse::<i64>() {
            Ok(parsed) => self.store.find(parsed).await?,
            Err(_) => None,
        };
        row.map(from_storage).ok_or(LogError::NotFound(key))
    }

    /// Validates a wire-shaped payload and persists it.
    ///
    /// Nothing reaches the store if validation fails.
    pub async fn create(&self, payload: &Value) -> Result<LogRecord> {
        let mut record = LogRecord::from_wire_value(payload)?;
        record.logged_at_timestamp.get_or_insert_with(Utc::now);
        self.persist(to_storage(record)).await
    }

    /// Validates and persists a typed record. Its `id` is ignored.
    pub async fn create_record(&self, record: &LogRecord) -> Result<LogRecord> {
        self.create(&serde_json::to_value(record)?).await
    }

    /// Deletes records according to `request`.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidRequest`] when no `start_id` is given or
    /// when `end_id` does not exceed `start_id`.
    pub async fn delete(&self, request: DeleteRequest) -> Result<DeleteOutcome> {
        if request.truncate {
            self.truncate().await?;
            return Ok(DeleteOutcome::Truncated);
        }

        let Some(start) = request.start_id else {
            return Err(LogError::InvalidRequest(
                "a start id is required to delete records".to_string(),
            ));
        };

        let deleted = match request.end_id {
            Some(end) if end <= start => {
                return Err(LogError::InvalidRequest(format!(
                    "endId {end} must be greater than startId {start}"
                )));
            }
            Some(end) => self.store.delete_range(start, end).await?,
            None => self.store.delete_id(start).await?,
        };

        info!(start, end = ?request.end_id, deleted, "deleted log records");
        Ok(DeleteOutcome::Deleted(deleted))
    }

    /// Erases every record and resets the identity sequence.
    ///
    /// This is unguarded; callers exposing it must restrict access.
    pub async fn truncate(&self) -> Result<()> {
        warn!(service = %self.service_name, "truncating log store");
        self.store.truncate().await
    }

    /// Writes an `INFO` health-check record.
    pub async fn record_health_check(&self, message: Option<&str>) -> Result<LogRecord> {
        let now = Utc::now();
        let record = LogRecord {
            id: None,
            log_level: "INFO".to_string(),
            log_category: HEALTH_CHECK_CATEGORY.to_string(),
            created_timestamp: Some(now),
            logged_at_timestamp: Some(now),
            message_id: Some(Uuid::new_v4()),
            publishing_service_name: Some(self.service_name.clone()),
            consuming_service_name: Some(self.service_name.clone()),
            message: message
                .filter(|m| !m.is_empty())
                .unwrap_or(DEFAULT_HEALTH_CHECK_MESSAGE)
                .to_string(),
        };
        self.create_record(&record).await
    }

    /// Inserts an already-validated row.
    pub(crate) async fn persist(&self, row: LogRow) -> Result<LogRecord> {
        let row = self.store.insert(row).await?;
        info!(
            id = ?row.id,
            level = %row.log_level,
            category = %row.log_category,
            "stored log record"
        );
        Ok(from_storage(row))
    }
}
