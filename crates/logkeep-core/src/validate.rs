//! Field rules for untyped log record input.
//!
//! Inbound records arrive as JSON in one of two naming conventions:
//!
//! - [`Shape::Wire`]: camelCase names used by API and queue producers
//! - [`Shape::Storage`]: snake_case names matching the persisted columns
//!
//! Both conventions share a single rule table. Every violated rule is
//! collected before failing so a caller can report all problems at once.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::{LogError, Result};
use crate::record::LogRecord;

/// Maximum length, in characters, of a service name.
pub const MAX_SERVICE_NAME_LEN: usize = 200;

/// Canonical 8-4-4-4-12 textual UUID.
static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap_or_else(|_| unreachable!())
});

/// Naming convention of an untyped record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// camelCase field names (API and queue payloads).
    Wire,
    /// snake_case column names (persisted rows).
    Storage,
}

/// A log record field, independent of naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Store-assigned identity.
    Id,
    /// Severity label.
    LogLevel,
    /// Free-form category.
    LogCategory,
    /// When the producer created the record.
    CreatedTimestamp,
    /// When the record was logged.
    LoggedAtTimestamp,
    /// Producer-side message identifier.
    MessageId,
    /// Service that published the record.
    PublishingServiceName,
    /// Service that consumed the record.
    ConsumingServiceName,
    /// Log message body.
    Message,
}

impl Field {
    /// Every field, in rule-evaluation order.
    pub const ALL: [Self; 9] = [
        Self::Id,
        Self::LogLevel,
        Self::LogCategory,
        Self::CreatedTimestamp,
        Self::LoggedAtTimestamp,
        Self::MessageId,
        Self::PublishingServiceName,
        Self::ConsumingServiceName,
        Self::Message,
    ];

    /// Returns the name of this field in the given convention.
    #[must_use]
    pub const fn key(self, shape: Shape) -> &'static str {
        match shape {
            Shape::Wire => match self {
                Self::Id => "id",
                Self::LogLevel => "logLevel",
                Self::LogCategory => "logCategory",
                Self::CreatedTimestamp => "createdTimestamp",
                Self::LoggedAtTimestamp => "loggedAtTimestamp",
                Self::MessageId => "messageId",
                Self::PublishingServiceName => "publishingServiceName",
                Self::ConsumingServiceName => "consumingServiceName",
                Self::Message => "message",
            },
            Shape::Storage => match self {
                Self::Id => "id",
                Self::LogLevel => "log_level",
                Self::LogCategory => "log_category",
                Self::CreatedTimestamp => "created_timestamp",
                Self::LoggedAtTimestamp => "logged_at_timestamp",
                Self::MessageId => "message_id",
                Self::PublishingServiceName => "publishing_service_name",
                Self::ConsumingServiceName => "consuming_service_name",
                Self::Message => "message",
            },
        }
    }

    /// Looks up a field by name in either convention.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.key(Shape::Wire) == key || f.key(Shape::Storage) == key)
    }
}

/// Validates a storage-shaped candidate, including its `id`.
///
/// # Errors
///
/// Returns [`LogError::Validation`] listing every violated rule.
pub fn validate_storage_shaped(data: &Value) -> Result<()> {
    validate(data, Shape::Storage)
}

/// Validates a wire-shaped candidate. The `id` field is not checked.
///
/// # Errors
///
/// Returns [`LogError::Validation`] listing every violated rule.
pub fn validate_wire_shaped(data: &Value) -> Result<()> {
    validate(data, Shape::Wire)
}

/// Validates `data` against the rule table in the given convention.
///
/// # Errors
///
/// Returns [`LogError::Validation`] listing every violated rule.
pub fn validate(data: &Value, shape: Shape) -> Result<()> {
    let violations = violations(data, shape);
    if violations.is_empty() {
        Ok(())
    } else {
        debug!(?shape, count = violations.len(), "log record rejected");
        Err(LogError::Validation(violations))
    }
}

/// Collects one message per violated rule, in field order.
#[must_use]
pub fn violations(data: &Value, shape: Shape) -> Vec<String> {
    let mut violations = Vec::new();

    for field in Field::ALL {
        let key = field.key(shape);
        let value = data.get(key);

        let ok = match field {
            // Wire input never carries an authoritative identity.
            Field::Id if shape == Shape::Wire => true,
            Field::Id => is_absent(value) || value.and_then(Value::as_i64).is_some_and(|id| id >= 0),
            Field::LogLevel | Field::LogCategory | Field::Message => {
                matches!(value, Some(Value::String(s)) if !s.is_empty())
            }
            Field::CreatedTimestamp | Field::LoggedAtTimestamp => {
                is_absent(value) || value.and_then(parse_timestamp).is_some()
            }
            Field::MessageId => is_absent(value) || value.and_then(parse_message_id).is_some(),
            Field::PublishingServiceName | Field::ConsumingServiceName => {
                is_absent(value)
                    || matches!(value, Some(Value::String(s)) if s.chars().count() <= MAX_SERVICE_NAME_LEN)
            }
        };

        if !ok {
            violations.push(format!(
                "{key} {}. Failed value: {}",
                rule_text(field),
                describe(value)
            ));
        }
    }

    violations
}

/// Validates and decodes an untyped record into the canonical model.
///
/// Wire input never yields an `id`.
pub(crate) fn decode(data: &Value, shape: Shape) -> Result<LogRecord> {
    validate(data, shape)?;

    let get = |field: Field| data.get(field.key(shape)).filter(|v| !is_absent(Some(*v)));
    let text = |field: Field| get(field).and_then(Value::as_str).map(str::to_owned);

    Ok(LogRecord {
        id: match shape {
            Shape::Wire => None,
            Shape::Storage => get(Field::Id).and_then(Value::as_i64),
        },
        log_level: text(Field::LogLevel).unwrap_or_default(),
        log_category: text(Field::LogCategory).unwrap_or_default(),
        created_timestamp: get(Field::CreatedTimestamp).and_then(parse_timestamp),
        logged_at_timestamp: get(Field::LoggedAtTimestamp).and_then(parse_timestamp),
        message_id: get(Field::MessageId).and_then(parse_message_id),
        publishing_service_name: text(Field::PublishingServiceName),
        consuming_service_name: text(Field::ConsumingServiceName),
        message: text(Field::Message).unwrap_or_default(),
    })
}

/// Parses a timestamp from a JSON string or epoch-milliseconds integer.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Parses a textual timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.frac]`, `YYYY-MM-DDTHH:MM:SS[.frac]`
/// and bare `YYYY-MM-DD`. Inputs without an offset are taken as UTC.
#[must_use]
pub fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parses a canonical-form UUID from a JSON string.
fn parse_message_id(value: &Value) -> Option<Uuid> {
    value
        .as_str()
        .filter(|s| UUID_REGEX.is_match(s))
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Optional fields treat missing, `null` and `""` alike.
fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

const fn rule_text(field: Field) -> &'static str {
    match field {
        Field::Id => "must be a non-negative integer",
        Field::LogLevel | Field::LogCategory | Field::Message => "is required and must be a string",
        Field::CreatedTimestamp | Field::LoggedAtTimestamp => "must be a valid date",
        Field::MessageId => "must be a valid UUID",
        Field::PublishingServiceName | Field::ConsumingServiceName => {
            "must be a string of max 200 chars"
        }
    }
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
