//! Configuration settings and validation.

use crate::{Error, Result};
use std::path::PathBuf;

/// Main configuration for a sitegraph run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory of source documents.
    pub content_dir: PathBuf,

    /// Output directory for emitted artifacts.
    pub output_dir: PathBuf,

    /// Directory for the `SQLite` graph cache.
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Clear the graph cache and output directory before building.
    pub reset: bool,

    /// Debounce window for filesystem events, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("./content"),
            output_dir: PathBuf::from("./public"),
            data_dir: PathBuf::from("./data"),
            log_level: "info".to_string(),
            reset: false,
            debounce_ms: 500,
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.content_dir.as_os_str().is_empty() {
            return Err(Error::config("content_dir cannot be empty"));
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::config("output_dir cannot be empty"));
        }

        if self.output_dir == self.content_dir {
            return Err(Error::config("output_dir cannot equal content_dir"));
        }

        if self.debounce_ms == 0 {
            return Err(Error::config("debounce_ms cannot be 0"));
        }

        Ok(())
    }

    /// Get the path to the `SQLite` graph cache file.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("sitegraph.db")
    }

    /// Get the static asset source directory (`<content>/static`).
    #[must_use]
    pub fn static_dir(&self) -> PathBuf {
        self.content_dir.join("static")
    }
}
