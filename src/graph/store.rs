//! `SQLite` connection management for the content graph.
//!
//! The store holds one writer connection (serialized by a mutex) and one
//! read-only connection. WAL mode lets the reader always see the last
//! committed state while a writer transaction is open, so a dev server can
//! answer requests during a background rebuild.

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::Arc;

use crate::error::StoreError;
use crate::Result;

/// Graph store connection wrapper.
///
/// Clone is cheap - it just clones the Arcs.
#[derive(Clone)]
pub struct GraphStore {
    writer: Arc<Mutex<Connection>>,
    reader: Arc<Mutex<Connection>>,
    path: String,
}

impl GraphStore {
    /// Open a store at the given path.
    ///
    /// Creates the database file and parent directories if they don't exist.
    /// Configures WAL mode and opens a separate read-only connection.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Open` if the store cannot be opened or
    /// configured. Fatal at startup.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Open(format!("cannot create data directory: {e}")))?;
        }

        let path_str = path.to_string_lossy().to_string();

        let writer = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::Open(format!("failed to open store: {e}")))?;

        configure(&writer)?;

        let reader = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::Open(format!("failed to open read connection: {e}")))?;

        tracing::debug!(path = %path_str, "Graph store opened with WAL mode");

        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
            reader: Arc::new(Mutex::new(reader)),
            path: path_str,
        })
    }

    /// Open an in-memory store for testing.
    ///
    /// In-memory stores share a single connection for reads and writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Open(format!("failed to open in-memory store: {e}")))?;

        configure(&conn)?;

        let writer = Arc::new(Mutex::new(conn));
        Ok(Self {
            reader: Arc::clone(&writer),
            writer,
            path: ":memory:".to_string(),
        })
    }

    /// Execute a function with the writer connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the function fails.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.writer.lock();
        f(&conn)
    }

    /// Execute a read-only function against the last committed state.
    ///
    /// Never blocked by an in-flight writer transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the function fails.
    pub fn with_read_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.reader.lock();
        f(&conn)
    }

    /// Execute a function inside a transaction.
    ///
    /// All mutations commit atomically; any error rolls the whole
    /// transaction back and is re-raised to the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction fails or if the function fails.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.writer.lock();

        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| StoreError::Database(format!("failed to begin transaction: {e}")))?;

        match f(&conn) {
            Ok(result) => {
                conn.execute_batch("COMMIT")
                    .map_err(|e| StoreError::Database(format!("failed to commit: {e}")))?;
                Ok(result)
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    /// Get the store path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Configure connection settings.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        PRAGMA foreign_keys = ON;
        ",
    )
    .map_err(|e| StoreError::Open(format!("failed to configure store: {e}")))?;
    Ok(())
}
