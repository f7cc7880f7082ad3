//! Schema migrations for the SQLite document store.
//!
//! The schema version lives in `PRAGMA user_version`. Each entry of
//! [`MIGRATIONS`] moves the schema up by one version and is applied inside
//! the same transaction as the version bump.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Schema steps, in order. Entry `n` upgrades version `n` to `n + 1`.
const MIGRATIONS: &[&str] = &[
    // v1: documents and secondary index definitions
    r#"
    CREATE TABLE documents (
        id TEXT PRIMARY KEY,
        rev TEXT NOT NULL,                -- "<generation>-<hash>"
        deleted INTEGER NOT NULL DEFAULT 0,
        body TEXT NOT NULL                -- JSON object without _rev/_deleted
    );

    CREATE TABLE doc_indexes (
        name TEXT PRIMARY KEY,
        fields TEXT NOT NULL,             -- JSON array of field paths
        created_at INTEGER NOT NULL
    );

    CREATE INDEX documents_live ON documents(deleted);
    "#,
];

/// The version a fully migrated database reports.
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

/// Bring the schema up to [`SCHEMA_VERSION`]. A no-op on an up-to-date database.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    let found = schema_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{} is newer than this build (v{})",
            found, SCHEMA_VERSION
        )));
    }

    let pending = &MIGRATIONS[found as usize..];
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for (offset, sql) in pending.iter().enumerate() {
        tx.execute_batch(sql)?;
        let version = found + offset as u32 + 1;
        tx.pragma_update(None, "user_version", version)?;
        tracing::debug!(version, "applied schema migration");
    }
    tx.commit()?;

    Ok(())
}

/// The schema version recorded in the database file.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
