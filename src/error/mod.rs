//! Error types and Result aliases for sitegraph.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use thiserror::Error;

/// Result type alias using sitegraph's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for sitegraph operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Graph store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Graph consistency error.
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// Document parsing error.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// File watching error.
    #[error("watcher error: {0}")]
    Watch(#[from] WatchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Store-specific errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Storage could not be opened. Fatal at startup.
    #[error("failed to open store: {0}")]
    Open(String),

    /// `SQLite` database error.
    #[error("database error: {0}")]
    Database(String),

    /// Schema migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Graph invariant violations.
///
/// Raised inside a store transaction; the transaction rolls back and the
/// graph stays at its prior consistent state.
#[derive(Error, Debug)]
pub enum GraphError {
    /// A graph invariant was violated.
    #[error("consistency violation: {0}")]
    Consistency(String),
}

/// Document parsing errors.
///
/// Always scoped to a single document; sibling documents in the same batch
/// are unaffected.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Document could not be read.
    #[error("failed to read '{path}': {reason}")]
    Read { path: String, reason: String },

    /// Frontmatter block failed to deserialize.
    #[error("invalid frontmatter in '{path}': {reason}")]
    Frontmatter { path: String, reason: String },
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatchError {
    /// Failed to watch path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl GraphError {
    /// Create a consistency error.
    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }
}
