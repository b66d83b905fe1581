//! Error types for the log record service.

use thiserror::Error;

/// Errors that can occur while validating, storing or querying log records.
///
/// The first three variants form the domain taxonomy. Everything else is a
/// failure from a collaborator (the store, the payload decoder) passed through
/// unchanged.
#[derive(Debug, Error)]
pub enum LogError {
    /// A lookup by identity found no row.
    #[error("record {0} not found in store")]
    NotFound(String),

    /// Input data failed one or more field rules.
    #[error("log record validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// The arguments of an operation were structurally wrong.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A payload could not be decoded as JSON.
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// A payload was not valid UTF-8.
    #[error("payload is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// The relational store reported an error.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Coarse classification of a [`LogError`], used by transport adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`LogError::NotFound`].
    NotFound,
    /// See [`LogError::Validation`].
    Validation,
    /// See [`LogError::InvalidRequest`].
    InvalidRequest,
    /// The payload itself could not be decoded.
    Malformed,
    /// Any other collaborator failure.
    Internal,
}

impl LogError {
    /// Returns the classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Decode(_) | Self::Encoding(_) => ErrorKind::Malformed,
            Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// Returns the violation list of a validation error.
    #[must_use]
    pub fn violations(&self) -> Option<&[String]> {
        match self {
            Self::Validation(violations) => Some(violations),
            _ => None,
        }
    }
}

/// Result type alias for log record operations.
pub type Result<T> = std::result::Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = LogError::NotFound("999999".to_string());
        assert_eq!(err.to_string(), "record 999999 not found in store");

        let err = LogError::InvalidRequest("endId 3 must be greater than startId 5".to_string());
        assert_eq!(
            err.to_string(),
            "invalid request: endId 3 must be greater than startId 5"
        );
    }

    #[test]
    fn validation_display_joins_every_violation() {
        let err = LogError::Validation(vec![
            "logLevel is required and must be a string. Failed value: undefined".to_string(),
            "message is required and must be a string. Failed value: null".to_string(),
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("log record validation failed: "));
        assert!(msg.contains("logLevel is required"));
        assert!(msg.contains("message is required"));
    }

    #[test]
    fn error_kinds() {
        assert_eq!(LogError::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(LogError::Validation(vec![]).kind(), ErrorKind::Validation);
        assert_eq!(
            LogError::InvalidRequest("x".into()).kind(),
            ErrorKind::InvalidRequest
        );
        assert_eq!(LogError::Database(sqlx::Error::PoolClosed).kind(), ErrorKind::Internal);

        let decode = serde_json::from_str::<serde_json::Value>("{not json").map_err(LogError::from);
        assert!(matches!(decode.map_err(|e| e.kind()), Err(ErrorKind::Malformed)));
    }

    #[test]
    fn violations_only_for_validation() {
        let err = LogError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.violations().map(<[String]>::len), Some(2));
        assert!(LogError::NotFound("1".into()).violations().is_none());
    }

    #[test]
    fn database_error_is_transparent() {
        let inner = sqlx::Error::PoolClosed;
        let expected = inner.to_string();
        let err: LogError = inner.into();
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LogError>();
    }
}
