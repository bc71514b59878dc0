//! Graph schema definitions and migrations.
//!
//! Provides versioned schema migrations for safe cache upgrades.

use rusqlite::Connection;

use crate::error::StoreError;
use crate::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if migrations fail.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| StoreError::Migration(format!("failed to create migrations table: {e}")))?;

    let current_version = get_current_version(conn)?;
    tracing::debug!(
        current = current_version,
        target = SCHEMA_VERSION,
        "Checking graph cache migrations"
    );

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Get the current schema version.
fn get_current_version(conn: &Connection) -> Result<i32> {
    let result = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    );

    match result {
        Ok(version) => Ok(version),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(StoreError::Migration(format!("failed to get version: {e}")).into()),
    }
}

/// Record a migration as applied.
fn record_migration(conn: &Connection, version: i32) -> Result<()> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let now_i64 = i64::try_from(now).unwrap_or_default();

    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)",
        rusqlite::params![version, now_i64],
    )
    .map_err(|e| StoreError::Migration(format!("failed to record migration: {e}")))?;

    Ok(())
}

/// Migration v1: node/edge tables plus the metadata row.
fn migrate_v1(conn: &Connection) -> Result<()> {
    tracing::info!("Applying migration v1: content graph schema");

    conn.execute_batch(
        r"
        -- Graph nodes. Entity-only columns are NULL for other kinds.
        CREATE TABLE IF NOT EXISTS nodes (
            id TEXT PRIMARY KEY,
            kind TEXT NOT NULL CHECK(kind IN ('entity', 'virtual', 'tag')),
            mtime_ms INTEGER,
            frontmatter TEXT,
            date_created TEXT,
            date_modified TEXT,
            date_published TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_nodes_kind ON nodes(kind);

        -- Directed edges, unique per (source, target, kind).
        CREATE TABLE IF NOT EXISTS edges (
            edge_id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            target TEXT NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('link', 'tag')),
            UNIQUE(source, target, kind)
        );

        CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source);
        CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target);
        CREATE INDEX IF NOT EXISTS idx_edges_kind ON edges(kind);

        -- Single-row metadata (content-root fingerprint).
        CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| StoreError::Migration(format!("v1 migration failed: {e}")))?;

    record_migration(conn, 1)?;
    tracing::debug!("Migration v1 complete");

    Ok(())
}

/// Verify all expected tables exist.
///
/// # Errors
///
/// Returns an error if any expected table is missing from the schema.
pub fn verify_schema(conn: &Connection) -> Result<()> {
    let tables = ["nodes", "edges", "metadata"];

    for table in tables {
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type='table' AND name=?",
                [table],
                |_| Ok(true),
            )
            .unwrap_or(false);

        if !exists {
            return Err(StoreError::Migration(format!("table '{table}' not found")).into());
        }
    }

    Ok(())
}
