//! In-memory log record store.
//!
//! Rows live in an id-ordered map behind a lock. Identity assignment mirrors
//! a database sequence: it starts at 1, never reuses a value, and is reset
//! only by [`LogRecordStore::truncate`].

use std::collections::BTreeMap;

use chrono::Utc;
use parking_lot::RwLock;

use crate::error::Result;
use crate::filter::LogFilter;
use crate::record::LogRow;
use crate::traits::LogRecordStore;

/// First identity handed out by a fresh or truncated store.
pub const INITIAL_ID: i64 = 1;

#[derive(Debug)]
struct Table {
    rows: BTreeMap<i64, LogRow>,
    next_id: i64,
}

/// Thread-safe in-process store implementing [`LogRecordStore`].
#[derive(Debug)]
pub struct MemoryLogStore {
    table: RwLock<Table>,
}

impl MemoryLogStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                rows: BTreeMap::new(),
                next_id: INITIAL_ID,
            }),
        }
    }

    /// Returns the number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().rows.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.read().rows.is_empty()
    }
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LogRecordStore for MemoryLogStore {
    async fn insert(&self, mut row: LogRow) -> Result<LogRow> {
        row.logged_at_timestamp.get_or_insert_with(Utc::now);

        let mut table = self.table.write();
        let id = table.next_id;
        table.next_id += 1;
        row.id = Some(id);
        table.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn select(&self, filter: &LogFilter) -> Result<Vec<LogRow>> {
        let table = self.table.read();
        Ok(table
            .rows
            .values()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect())
    }

    async fn find(&self, id: i64) -> Result<Option<LogRow>> {
        Ok(self.table.read().rows.get(&id).cloned())
    }

    async fn delete_id(&self, id: i64) -> Result<u64> {
        Ok(u64::from(self.table.write().rows.remove(&id).is_some()))
    }

    async fn delete_range(&self, start: i64, end: i64) -> Result<u64> {
        let mut table = self.table.write();
        let before = table.rows.len();
        table.rows.retain(|id, _| !(start..=end).contains(id));
        Ok((before - table.rows.len()) as u64)
    }

    async fn truncate(&self) -> Result<()> {
        let mut table = self.table.write();
        table.rows.clear();
        table.next_id = INITIAL_ID;
        Ok(())
    }
}
