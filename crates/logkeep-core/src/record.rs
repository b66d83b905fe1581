//! The log record model and its two representations.
//!
//! - [`LogRecord`]: the canonical record; serializes in the wire (camelCase) shape
//! - [`LogRow`]: the storage (snake_case) shape, one field per persisted column
//!
//! [`to_storage`] and [`from_storage`] are pure renames and exact inverses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::validate::{self, Shape};

/// A single log entry as seen by API and queue producers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Store-assigned identity; `None` until persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Severity label, e.g. `INFO`.
    pub log_level: String,
    /// Free-form category.
    pub log_category: String,
    /// When the producer created the record.
    #[serde(default)]
    pub created_timestamp: Option<DateTime<Utc>>,
    /// When the record was logged.
    #[serde(default)]
    pub logged_at_timestamp: Option<DateTime<Utc>>,
    /// Producer-side message identifier.
    #[serde(default)]
    pub message_id: Option<Uuid>,
    /// Service that published the record.
    #[serde(default)]
    pub publishing_service_name: Option<String>,
    /// Service that consumed the record.
    #[serde(default)]
    pub consuming_service_name: Option<String>,
    /// The log message body.
    pub message: String,
}

/// A log entry in the persisted column layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LogRow {
    /// Primary key; `None` before insertion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// `log_level` column.
    pub log_level: String,
    /// `log_category` column.
    pub log_category: String,
    /// `created_timestamp` column.
    #[serde(default)]
    pub created_timestamp: Option<DateTime<Utc>>,
    /// `logged_at_timestamp` column.
    #[serde(default)]
    pub logged_at_timestamp: Option<DateTime<Utc>>,
    /// `message_id` column.
    #[serde(default)]
    pub message_id: Option<Uuid>,
    /// `publishing_service_name` column.
    #[serde(default)]
    pub publishing_service_name: Option<String>,
    /// `consuming_service_name` column.
    #[serde(default)]
    pub consuming_service_name: Option<String>,
    /// `message` column.
    pub message: String,
}

/// Maps a record to its storage representation.
#[must_use]
pub fn to_storage(record: LogRecord) -> LogRow {
    LogRow {
        id: record.id,
        log_level: record.log_level,
        log_category: record.log_category,
        created_timestamp: record.created_timestamp,
        logged_at_timestamp: record.logged_at_timestamp,
        message_id: record.message_id,
        publishing_service_name: record.publishing_service_name,
        consuming_service_name: record.consuming_service_name,
        message: record.message,
    }
}

/// Maps a storage row back to a record.
#[must_use]
pub fn from_storage(row: LogRow) -> LogRecord {
    LogRecord {
        id: row.id,
        log_level: row.log_level,
        log_category: row.log_category,
        created_timestamp: row.created_timestamp,
        logged_at_timestamp: row.logged_at_timestamp,
        message_id: row.message_id,
        publishing_service_name: row.publishing_service_name,
        consuming_service_name: row.consuming_service_name,
        message: row.message,
    }
}

impl From<LogRecord> for LogRow {
    fn from(record: LogRecord) -> Self {
        to_storage(record)
    }
}

impl From<LogRow> for LogRecord {
    fn from(row: LogRow) -> Self {
        from_storage(row)
    }
}

impl LogRecord {
    /// Decodes a wire-shaped JSON payload.
    ///
    /// Any `id` in the payload is ignored.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every violated rule.
    pub fn from_wire_value(data: &Value) -> Result<Self> {
        validate::decode(data, Shape::Wire)
    }
}

impl LogRow {
    /// Decodes a storage-shaped JSON object, validating it first.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every violated rule.
    pub fn from_storage_value(data: &Value) -> Result<Self> {
        validate::decode(data, Shape::Storage).map(to_storage)
    }
}
