/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for the term cache table,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use log::debug;
use rusqlite::{OptionalExtension, params};

use super::connection::DatabaseConnection;
use super::models::{TermCacheRow, TermCacheTableStats};

/// Repository for database operations
#[derive(Clone, Debug)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    // =========================================================================
    // Term Cache Operations
    // =========================================================================

    /// Get a cached term set row by key fingerprint
    pub async fn get_term_cache_row(&self, key_fingerprint: &str) -> Result<Option<TermCacheRow>> {
        let key_fingerprint = key_fingerprint.to_string();

        self.db
            .execute_async(move |conn| {
                let row = conn
                    .query_row(
                        r#"
                        SELECT key_fingerprint, title, year, terms_json, fetched_at_ms, ttl_secs
                        FROM term_cache WHERE key_fingerprint = ?1
                        "#,
                        [&key_fingerprint],
                        |row| {
                            Ok(TermCacheRow {
                                key_fingerprint: row.get(0)?,
                                title: row.get(1)?,
                                year: row.get(2)?,
                                terms_json: row.get(3)?,
                                fetched_at_ms: row.get(4)?,
                                ttl_secs: row.get(5)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await
    }

    /// Insert or atomically replace a cached term set
    pub async fn upsert_term_cache_row(&self, row: &TermCacheRow) -> Result<()> {
        let row = row.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT OR REPLACE INTO term_cache (
                        key_fingerprint, title, year, terms_json, fetched_at_ms, ttl_secs
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    params![
                        row.key_fingerprint,
                        row.title,
                        row.year,
                        row.terms_json,
                        row.fetched_at_ms,
                        row.ttl_secs,
                    ],
                )?;
                debug!("Stored term cache row for {} ({})", row.title, row.year);
                Ok(())
            })
            .await
    }

    /// Delete a cached term set; returns whether a row existed
    pub async fn delete_term_cache_row(&self, key_fingerprint: &str) -> Result<bool> {
        let key_fingerprint = key_fingerprint.to_string();

        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute("DELETE FROM term_cache WHERE key_fingerprint = ?1", [&key_fingerprint])?;
                Ok(deleted > 0)
            })
            .await
    }

    /// Delete every row whose TTL has elapsed at `now_ms`
    pub async fn delete_expired_term_cache_rows(&self, now_ms: i64) -> Result<usize> {
        self.db
            .execute_async(move |conn| {
                let deleted = conn.execute(
                    "DELETE FROM term_cache WHERE ?1 - fetched_at_ms >= ttl_secs * 1000",
                    [now_ms],
                )?;
                Ok(deleted)
            })
            .await
    }

    /// Get term cache table statistics
    pub async fn get_term_cache_stats(&self) -> Result<TermCacheTableStats> {
        self.db
            .execute_async(|conn| {
                let (total_records, total_bytes): (i64, i64) = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(LENGTH(terms_json)), 0) FROM term_cache",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                Ok(TermCacheTableStats {
                    total_records,
                    total_bytes,
                })
            })
            .await
    }
}
