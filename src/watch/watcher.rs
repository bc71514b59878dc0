//! File system watcher over the content root.

#![allow(clippy::used_underscore_binding)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind, Debouncer};
use tokio::sync::mpsc;

use super::events::{WatchEvent, WatchEventKind};
use crate::error::WatchError;
use crate::Result;

/// Watches the content root and yields debounced, classified events.
///
/// Classification is by existence at delivery time: a path that still exists
/// is a change, a missing one is a delete. Renames surface as one delete and
/// one change within the same debounce window.
pub struct FileWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    event_rx: mpsc::Receiver<WatchEvent>,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `content_dir` recursively.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory does not exist or the OS watcher
    /// cannot be created.
    pub fn new(content_dir: &Path, debounce: Duration) -> Result<Self> {
        if !content_dir.is_dir() {
            return Err(WatchError::WatchFailed {
                path: content_dir.display().to_string(),
                reason: "directory does not exist".to_string(),
            }
            .into());
        }

        let (event_tx, event_rx) = mpsc::channel(100);

        let mut debouncer = new_debouncer(
            debounce,
            move |result: std::result::Result<
                Vec<notify_debouncer_mini::DebouncedEvent>,
                notify::Error,
            >| {
                match result {
                    Ok(events) => {
                        for event in events {
                            if !matches!(event.kind, DebouncedEventKind::Any) {
                                continue;
                            }
                            let Some(classified) = classify(event.path) else {
                                continue;
                            };
                            let _ = event_tx.blocking_send(classified);
                        }
                    }
                    Err(e) => {
                        tracing::error!("Watch error: {:?}", e);
                    }
                }
            },
        )
        .map_err(|e| WatchError::WatchFailed {
            path: "init".to_string(),
            reason: e.to_string(),
        })?;

        debouncer
            .watcher()
            .watch(content_dir, RecursiveMode::Recursive)
            .map_err(|e| WatchError::WatchFailed {
                path: content_dir.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(path = %content_dir.display(), "Watching content directory");

        Ok(Self {
            _debouncer: debouncer,
            event_rx,
            root: content_dir.to_path_buf(),
        })
    }

    /// Receive the next event.
    ///
    /// Returns `None` if the watcher has been dropped.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.event_rx.recv().await
    }

    /// The watched root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Classify a debounced path, dropping non-markdown paths.
fn classify(path: PathBuf) -> Option<WatchEvent> {
    if path.extension().map_or(true, |ext| ext != "md") {
        return None;
    }

    let kind = if path.exists() {
        WatchEventKind::Change
    } else {
        WatchEventKind::Delete
    };
    Some(WatchEvent { path, kind })
}
