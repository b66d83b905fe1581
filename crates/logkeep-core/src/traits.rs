//! Traits for log record storage backends.
//!
//! [`LogRecordStore`] is the seam between the persistence service and the
//! relational table holding log rows. Implementations: [`crate::MemoryLogStore`]
//! and [`crate::PgLogStore`].

use std::future::Future;
use std::sync::Arc;

use crate::error::Result;
use crate::filter::LogFilter;
use crate::record::LogRow;

/// A table of log rows keyed by an auto-incrementing identity.
///
/// Timeouts and cancellation are the implementation's concern; errors are
/// returned to the caller unchanged.
pub trait LogRecordStore: Send + Sync {
    /// Inserts a row and returns it with its assigned `id`.
    ///
    /// Any `id` already on the row is ignored. A missing
    /// `logged_at_timestamp` defaults to the insertion time.
    fn insert(&self, row: LogRow) -> impl Future<Output = Result<LogRow>> + Send;

    /// Returns every row matching the filter.
    fn select(&self, filter: &LogFilter) -> impl Future<Output = Result<Vec<LogRow>>> + Send;

    /// Returns the row with the given id, if any.
    fn find(&self, id: i64) -> impl Future<Output = Result<Option<LogRow>>> + Send;

    /// Deletes the row with the given id, returning the number of rows removed.
    fn delete_id(&self, id: i64) -> impl Future<Output = Result<u64>> + Send;

    /// Deletes every row whose id is in `start..=end`.
    fn delete_range(&self, start: i64, end: i64) -> impl Future<Output = Result<u64>> + Send;

    /// Removes every row and resets the identity sequence.
    fn truncate(&self) -> impl Future<Output = Result<()>> + Send;
}

impl<S: LogRecordStore> LogRecordStore for Arc<S> {
    fn insert(&self, row: LogRow) -> impl Future<Output = Result<LogRow>> + Send {
        (**self).insert(row)
    }

    fn select(&self, filter: &LogFilter) -> impl Future<Output = Result<Vec<LogRow>>> + Send {
        (**self).select(filter)
    }

    fn find(&self, id: i64) -> impl Future<Output = Result<Option<LogRow>>> + Send {
        (**self).find(id)
    }

    fn delete_id(&self, id: i64) -> impl Future<Output = Result<u64>> + Send {
        (**self).delete_id(id)
    }

    fn delete_range(&self, start: i64, end: i64) -> impl Future<Output = Result<u64>> + Send {
        (**self).delete_range(start, end)
    }

    fn truncate(&self) -> impl Future<Output = Result<()>> + Send {
        (**self).truncate()
    }
}
