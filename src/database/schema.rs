/*!
 * Term cache schema and migrations.
 *
 * The version lives in SQLite's `user_version` pragma. `MIGRATIONS[n]`
 * upgrades a database from version `n` to `n + 1`.
 */

use anyhow::{Context, Result, bail};
use log::{debug, info};
use rusqlite::Connection;

/// Schema version written by this build
pub const SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

const MIGRATIONS: &[&str] = &[
    // v1: cached external term sets, keyed by production fingerprint
    r#"
    CREATE TABLE term_cache (
        key_fingerprint TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        year INTEGER NOT NULL,
        terms_json TEXT NOT NULL,
        fetched_at_ms INTEGER NOT NULL,
        ttl_secs INTEGER NOT NULL
    );
    CREATE INDEX idx_term_cache_expiry ON term_cache(fetched_at_ms, ttl_secs);
    "#,
];

/// Bring the database up to `SCHEMA_VERSION`
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    // WAL lets other processes read the cache while one job writes
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("Cannot enable WAL journal")?;

    let found = user_version(conn)?;
    if found > SCHEMA_VERSION {
        bail!(
            "Term cache schema v{} is newer than supported v{}",
            found,
            SCHEMA_VERSION
        );
    }
    if found == SCHEMA_VERSION {
        debug!("Term cache schema at v{}", found);
        return Ok(());
    }

    for (from, sql) in MIGRATIONS.iter().enumerate().skip(found as usize) {
        let to = from as i32 + 1;
        info!("Migrating term cache schema to v{}", to);
        conn.execute_batch(&format!("BEGIN;\n{}\nPRAGMA user_version = {};\nCOMMIT;", sql, to))
            .with_context(|| format!("Term cache migration to v{} failed", to))?;
    }

    Ok(())
}

fn user_version(conn: &Connection) -> Result<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .context("Cannot read term cache schema version")
}
