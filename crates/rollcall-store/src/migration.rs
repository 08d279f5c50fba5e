//! Database schema migrations for SQLite.
//!
//! A simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_seconds()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- The block sequence, one row per chain position
        CREATE TABLE blocks (
            block_index INTEGER PRIMARY KEY,  -- chain position, 0 = genesis
            attendances TEXT NOT NULL,        -- JSON: "genesis" or array of proofs
            prev_hash BLOB NOT NULL,          -- 32 bytes
            timestamp INTEGER NOT NULL,       -- seconds since epoch
            hash BLOB NOT NULL                -- 32 bytes
        );

        -- Session-root entries, insertion-ordered via rowid
        CREATE TABLE roots (
            session_id TEXT NOT NULL,
            block_index INTEGER NOT NULL
        );

        CREATE INDEX idx_roots_session ON roots(session_id);
        "#,
    )?;

    Ok(())
}

/// Get current time in seconds.
fn now_seconds() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs() as i64
}
