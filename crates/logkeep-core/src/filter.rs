//! Query filters for listing log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LogError, Result};
use crate::record::LogRow;
use crate::validate::{parse_timestamp_str, Field};

/// Filter criteria for listing log records.
///
/// Every present criterion must hold. `message` is a case-sensitive
/// substring match; all other fields use exact equality. An empty filter
/// matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    /// Exact log level.
    #[serde(default, alias = "log_level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Exact log category.
    #[serde(default, alias = "log_category", skip_serializing_if = "Option::is_none")]
    pub log_category: Option<String>,
    /// Exact creation timestamp.
    #[serde(default, alias = "created_timestamp", skip_serializing_if = "Option::is_none")]
    pub created_timestamp: Option<DateTime<Utc>>,
    /// Exact logged-at timestamp.
    #[serde(default, alias = "logged_at_timestamp", skip_serializing_if = "Option::is_none")]
    pub logged_at_timestamp: Option<DateTime<Utc>>,
    /// Exact message id.
    #[serde(default, alias = "message_id", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Uuid>,
    /// Exact publishing service name.
    #[serde(default, alias = "publishing_service_name", skip_serializing_if = "Option::is_none")]
    pub publishing_service_name: Option<String>,
    /// Exact consuming service name.
    #[serde(default, alias = "consuming_service_name", skip_serializing_if = "Option::is_none")]
    pub consuming_service_name: Option<String>,
    /// Substring of the message body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LogFilter {
    /// Creates a new empty filter that matches all records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a log level criterion.
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Adds a log category criterion.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.log_category = Some(category.into());
        self
    }

    /// Adds a creation timestamp criterion.
    #[must_use]
    pub const fn with_created_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.created_timestamp = Some(timestamp);
        self
    }

    /// Adds a logged-at timestamp criterion.
    #[must_use]
    pub const fn with_logged_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.logged_at_timestamp = Some(timestamp);
        self
    }

    /// Adds a message id criterion.
    #[must_use]
    pub const fn with_message_id(mut self, message_id: Uuid) -> Self {
        self.message_id = Some(message_id);
        self
    }

    /// Adds a publishing service criterion.
    #[must_use]
    pub fn with_publishing_service(mut self, name: impl Into<String>) -> Self {
        self.publishing_service_name = Some(name.into());
        self
    }

    /// Adds a consuming service criterion.
    #[must_use]
    pub fn with_consuming_service(mut self, name: impl Into<String>) -> Self {
        self.consuming_service_name = Some(name.into());
        self
    }

    /// Adds a message substring criterion.
    #[must_use]
    pub fn with_message_containing(mut self, text: impl Into<String>) -> Self {
        self.message = Some(text.into());
        self
    }

    /// Returns true if no criterion is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Builds a filter from key/value pairs such as a query string.
    ///
    /// Keys may use either naming convention. Unknown keys, `id`, and empty
    /// values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::InvalidRequest`] if a timestamp or message id value
    /// cannot be parsed.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filter = Self::new();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            if value.is_empty() {
                continue;
            }
            let Some(field) = Field::from_key(key) else {
                continue;
            };

            match field {
                Field::Id => {}
                Field::LogLevel => filter.log_level = Some(value.to_string()),
                Field::LogCategory => filter.log_category = Some(value.to_string()),
                Field::CreatedTimestamp => {
                    filter.created_timestamp = Some(parse_filter_timestamp(key, value)?);
                }
                Field::LoggedAtTimestamp => {
                    filter.logged_at_timestamp = Some(parse_filter_timestamp(key, value)?);
                }
                Field::MessageId => {
                    let id = Uuid::parse_str(value).map_err(|e| {
                        LogError::InvalidRequest(format!("{key} filter is not a valid UUID: {e}"))
                    })?;
                    filter.message_id = Some(id);
                }
                Field::PublishingServiceName => {
                    filter.publishing_service_name = Some(value.to_string());
                }
                Field::ConsumingServiceName => {
                    filter.consuming_service_name = Some(value.to_string());
                }
                Field::Message => filter.message = Some(value.to_string()),
            }
        }

        Ok(filter)
    }

    /// Checks if a stored row satisfies every criterion.
    #[must_use]
    pub fn matches(&self, row: &LogRow) -> bool {
        if let Some(ref level) = self.log_level {
            if row.log_level != *level {
                return false;
            }
        }
        if let Some(ref category) = self.log_category {
            if row.log_category != *category {
                return false;
            }
        }
        if self.created_timestamp.is_some() && row.created_timestamp != self.created_timestamp {
            return false;
        }
        if self.logged_at_timestamp.is_some() && row.logged_at_timestamp != self.logged_at_timestamp
        {
            return false;
        }
        if self.message_id.is_some() && row.message_id != self.message_id {
            return false;
        }
        if self.publishing_service_name.is_some()
            && row.publishing_service_name != self.publishing_service_name
        {
            return false;
        }
        if self.consuming_service_name.is_some()
            && row.consuming_service_name != self.consuming_service_name
        {
            return false;
        }
        if let Some(ref text) = self.message {
            if !row.message.contains(text.as_str()) {
                return false;
            }
        }
        true
    }
}

fn parse_filter_timestamp(key: &str, value: &str) -> Result<DateTime<Utc>> {
    parse_timestamp_str(value).ok_or_else(|| {
        LogError::InvalidRequest(format!("{key} filter is not a valid date: {value}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(level: &str, message: &str) -> LogRow {
        LogRow {
            id: Some(1),
            log_level: level.to_string(),
            log_category: "api".to_string(),
            created_timestamp: parse_timestamp_str("2024-06-17T08:15:23Z"),
            logged_at_timestamp: None,
            message_id: Uuid::parse_str("a1e1b2c3-1111-4d5e-8f9a-1b2c3d4e5f01").ok(),
            publishing_service_name: Some("workhorse-api".to_string()),
            consuming_service_name: None,
            message: message.to_string(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = LogFilter::new();
        assert!(filter.is_empty());
        assert!(filter.matches(&make_row("INFO", "anything")));
    }

    #[test]
    fn filter_by_level() {
        let row = make_row("ERROR", "boom");
        assert!(LogFilter::new().with_level("ERROR").matches(&row));
        assert!(!LogFilter::new().with_level("INFO").matches(&row));
        assert!(!LogFilter::new().with_level("error").matches(&row));
    }

    #[test]
    fn filter_message_is_case_sensitive_substring() {
        let row = make_row("INFO", "API request completed");
        assert!(LogFilter::new().with_message_containing("API request").matches(&row));
        assert!(!LogFilter::new().with_message_containing("api request").matches(&row));
    }

    #[test]
    fn filter_optional_column_against_null() {
        let row = make_row("INFO", "m");
        assert!(!LogFilter::new().with_consuming_service("rabbitmq").matches(&row));
        assert!(LogFilter::new().with_publishing_service("workhorse-api").matches(&row));
    }

    #[test]
    fn criteria_combine_with_and() {
        let row = make_row("ERROR", "disk full");
        let both = LogFilter::new().with_level("ERROR").with_category("api");
        assert!(both.matches(&row));
        let mismatch = LogFilter::new().with_level("ERROR").with_category("storage");
        assert!(!mismatch.matches(&row));
    }

    #[test]
    fn filter_by_timestamp_and_message_id() {
        let row = make_row("INFO", "m");
        let created = row.created_timestamp.expect("created timestamp");
        let id = row.message_id.expect("message id");
        assert!(LogFilter::new().with_created_at(created).with_message_id(id).matches(&row));
        assert!(!LogFilter::new().with_logged_at(created).matches(&row));
    }

    #[test]
    fn from_pairs_accepts_both_conventions() {
        let filter = LogFilter::from_pairs([
            ("log_level", "ERROR"),
            ("logCategory", "api"),
            ("messageId", "a1e1b2c3-1111-4d5e-8f9a-1b2c3d4e5f01"),
            ("created_timestamp", "2024-06-17T08:15:23Z"),
        ])
        .expect("valid filter");
        assert_eq!(filter.log_level.as_deref(), Some("ERROR"));
        assert_eq!(filter.log_category.as_deref(), Some("api"));
        assert!(filter.message_id.is_some());
        assert!(filter.matches(&make_row("ERROR", "x")));
    }

    #[test]
    fn from_pairs_skips_unknown_and_empty() {
        let filter = LogFilter::from_pairs([("startId", "3"), ("id", "4"), ("logLevel", "")])
            .expect("valid filter");
        assert!(filter.is_empty());
    }

    #[test]
    fn from_pairs_rejects_bad_values() {
        let err = LogFilter::from_pairs([("messageId", "nope")]);
        assert!(matches!(err, Err(LogError::InvalidRequest(_))));

        let err = LogFilter::from_pairs([("loggedAtTimestamp", "not-a-date")]);
        assert!(matches!(err, Err(LogError::InvalidRequest(msg)) if msg.contains("not-a-date")));
    }

    #[test]
    fn filter_deserializes_from_either_convention() {
        let filter: LogFilter =
            serde_json::from_str(r#"{"log_level":"ERROR","consumingServiceName":"rabbitmq"}"#)
                .expect("deserialize");
        assert_eq!(filter.log_level.as_deref(), Some("ERROR"));
        assert_eq!(filter.consuming_service_name.as_deref(), Some("rabbitmq"));
    }
}
