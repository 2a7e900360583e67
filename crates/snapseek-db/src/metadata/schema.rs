//! Metadata schema and migrations.
//!
//! The schema version lives in SQLite's `user_version` pragma. Each entry of
//! [`MIGRATIONS`] moves the database one version forward and runs inside its
//! own transaction. Migrations are additive only: new tables or new nullable
//! columns, never drops or renames.

use crate::error::DbResult;
use rusqlite::Connection;
use tracing::{debug, info};

/// Ordered migrations. Index `i` upgrades from version `i` to `i + 1`.
const MIGRATIONS: &[&str] = &[
    // v1: base table
    r#"
    CREATE TABLE IF NOT EXISTS entries (
        row_index    INTEGER PRIMARY KEY,
        external_id  TEXT NOT NULL UNIQUE,
        stored_path  TEXT NOT NULL,
        auto_caption TEXT,
        user_caption TEXT,
        active       INTEGER NOT NULL DEFAULT 1
    );
    "#,
    // v2: ingestion timestamp
    r#"
    ALTER TABLE entries ADD COLUMN created_at TEXT;
    "#,
    // v3: listing active entries in row order
    r#"
    CREATE INDEX IF NOT EXISTS idx_entries_active ON entries(active, row_index);
    "#,
];

/// Latest schema version this build knows.
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

/// Current `user_version` of the database.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

/// Bring the database up to [`SCHEMA_VERSION`].
///
/// Returns the number of migrations applied.
pub fn migrate(conn: &mut Connection) -> DbResult<usize> {
    let current = schema_version(conn)?;
    debug!("Metadata schema at version {}", current);

    let mut applied = 0;
    for (i, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let target = i as u32 + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", target)?;
        tx.commit()?;
        applied += 1;
        debug!("Applied metadata migration to version {}", target);
    }

    if applied > 0 {
        info!(
            "Metadata schema migrated from version {} to {}",
            current, SCHEMA_VERSION
        );
    }
    Ok(applied)
}
