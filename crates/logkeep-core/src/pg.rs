//! PostgreSQL-backed log record store.

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::error::Result;
use crate::filter::LogFilter;
use crate::record::LogRow;
use crate::traits::LogRecordStore;

/// Name of the table holding log rows.
pub const TABLE: &str = "logs";

const COLUMNS: &str = "id, log_level, log_category, created_timestamp, logged_at_timestamp, \
     message_id, publishing_service_name, consuming_service_name, message";

/// DDL for the log table, applied by [`PgLogStore::ensure_schema`].
pub const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS logs (
    id BIGSERIAL PRIMARY KEY,
    log_level TEXT NOT NULL,
    log_category TEXT NOT NULL,
    created_timestamp TIMESTAMPTZ,
    logged_at_timestamp TIMESTAMPTZ DEFAULT now(),
    message_id UUID,
    publishing_service_name VARCHAR(200),
    consuming_service_name VARCHAR(200),
    message TEXT NOT NULL
)";

/// [`LogRecordStore`] over a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    /// Wraps an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!(max_connections, "connected to log database");
        Ok(Self::new(pool))
    }

    /// Creates the log table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Builds the `SELECT` for a filter; every criterion is a bound parameter.
fn select_query(filter: &LogFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT {COLUMNS} FROM {TABLE} WHERE TRUE"));

    if let Some(ref level) = filter.log_level {
        query.push(" AND log_level = ").push_bind(level.clone());
    }
    if let Some(ref category) = filter.log_category {
        query.push(" AND log_category = ").push_bind(category.clone());
    }
    if let Some(created) = filter.created_timestamp {
        query.push(" AND created_timestamp = ").push_bind(created);
    }
    if let Some(logged_at) = filter.logged_at_timestamp {
        query.push(" AND logged_at_timestamp = ").push_bind(logged_at);
    }
    if let Some(message_id) = filter.message_id {
        query.push(" AND message_id = ").push_bind(message_id);
    }
    if let Some(ref name) = filter.publishing_service_name {
        query.push(" AND publishing_service_name = ").push_bind(name.clone());
    }
    if let Some(ref name) = filter.consuming_service_name {
        query.push(" AND consuming_service_name = ").push_bind(name.clone());
    }
    if let Some(ref text) = filter.message {
        // strpos is case-sensitive and needs no LIKE escaping.
        query.push(" AND strpos(message, ").push_bind(text.clone()).push(") > 0");
    }

    query.push(" ORDER BY id");
    query
}

impl LogRecordStore for PgLogStore {
    async fn insert(&self, row: LogRow) -> Result<LogRow> {
        let sql = format!(
            "INSERT INTO {TABLE} (log_level, log_category, created_timestamp, logged_at_timestamp, \
             message_id, publishing_service_name, consuming_service_name, message) \
             VALUES ($1, $2, $3, COALESCE($4, now()), $5, $6, $7, $8) RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, LogRow>(&sql)
            .bind(row.log_level)
            .bind(row.log_category)
            .bind(row.created_timestamp)
            .bind(row.logged_at_timestamp)
            .bind(row.message_id)
            .bind(row.publishing_service_name)
            .bind(row.consuming_service_name)
            .bind(row.message)
            .fetch_one(&self.pool)
            .await?;
        Ok(inserted)
    }

    async fn select(&self, filter: &LogFilter) -> Result<Vec<LogRow>> {
        let mut query = select_query(filter);
        let rows = query.build_query_as::<LogRow>().fetch_all(&self.pool).await?;
        debug!(count = rows.len(), "selected log rows");
        Ok(rows)
    }

    async fn find(&self, id: i64) -> Result<Option<LogRow>> {
        let sql = format!("SELECT {COLUMNS} FROM {TABLE} WHERE id = $1");
        let row = sqlx::query_as::<_, LogRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_id(&self, id: i64) -> Result<u64> {
        let sql = format!("DELETE FROM {TABLE} WHERE id = $1");
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_range(&self, start: i64, end: i64) -> Result<u64> {
        let sql = format!("DELETE FROM {TABLE} WHERE id BETWEEN $1 AND $2");
        let result = sqlx::query(&sql)
            .bind(start)
            .bind(end)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn truncate(&self) -> Result<()> {
        let sql = format!("TRUNCATE TABLE {TABLE} RESTART IDENTITY");
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::parse_timestamp_str;

    #[test]
    fn empty_filter_selects_all_rows() {
        let query = select_query(&LogFilter::new());
        assert_eq!(
            query.sql(),
            format!("SELECT {COLUMNS} FROM logs WHERE TRUE ORDER BY id")
        );
    }

    #[test]
    fn every_criterion_is_bound() {
        let created = parse_timestamp_str("2024-06-17T08:15:23Z").expect("timestamp");
        let filter = LogFilter::new()
            .with_level("ERROR")
            .with_category("api")
            .with_created_at(created)
            .with_message_containing("100%_done");
        let query = select_query(&filter);
        let sql = query.sql();
        assert!(sql.contains("log_level = $1"));
        assert!(sql.contains("log_category = $2"));
        assert!(sql.contains("created_timestamp = $3"));
        assert!(sql.contains("strpos(message, $4) > 0"));
        assert!(!sql.contains("100%_done"));
    }

    #[test]
    fn schema_matches_row_columns() {
        for column in COLUMNS.split(',').map(str::trim) {
            assert!(SCHEMA.contains(column), "schema is missing {column}");
        }
        assert!(SCHEMA.contains("VARCHAR(200)"));
    }
}
