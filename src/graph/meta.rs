//! Store metadata: the content-root fingerprint and full invalidation.

use rusqlite::Connection;

use crate::error::StoreError;
use crate::Result;

const FINGERPRINT_KEY: &str = "content_root_fingerprint";

/// Get the stored content-root fingerprint, if any.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn stored_root_fingerprint(conn: &Connection) -> Result<Option<String>> {
    let result = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?",
        [FINGERPRINT_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(StoreError::Database(e.to_string()).into()),
    }
}

/// Store the content-root fingerprint.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn store_root_fingerprint(conn: &Connection, fingerprint: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)",
        rusqlite::params![FINGERPRINT_KEY, fingerprint],
    )
    .map_err(|e| StoreError::Database(e.to_string()))?;
    Ok(())
}

/// Clear all graph data. Used for full cache invalidation.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn clear_all(conn: &Connection) -> Result<()> {
    conn.execute_batch("DELETE FROM nodes; DELETE FROM edges; DELETE FROM metadata;")
        .map_err(|e| StoreError::Database(e.to_string()))?;
    Ok(())
}

/// Fingerprint for a content root.
///
/// Hashes the canonical absolute path, so two runs pointed at the same tree
/// agree and a relocated root invalidates the cache.
#[must_use]
pub fn root_fingerprint(content_dir: &std::path::Path) -> String {
    let canonical = std::fs::canonicalize(content_dir).unwrap_or_else(|_| content_dir.to_path_buf());
    blake3::hash(canonical.to_string_lossy().as_bytes())
        .to_hex()
        .to_string()
}
