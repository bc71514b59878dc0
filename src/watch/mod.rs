//! Watch mode: continuous rebuilds driven by filesystem events.

pub mod events;
pub mod serializer;
pub mod watcher;

use std::sync::Arc;
use std::time::Duration;

pub use events::{PendingChanges, WatchEvent, WatchEventKind};
pub use serializer::RebuildSerializer;
pub use watcher::FileWatcher;

use crate::build::Pipeline;
use crate::config::Config;
use crate::Result;

/// Run an initial build, then rebuild on every debounced change burst.
///
/// Rebuild failures are logged and the loop keeps running; only a watcher
/// setup failure is fatal.
///
/// # Errors
///
/// Returns an error if the watcher cannot be started or the initial build
/// fails.
pub async fn watch(config: &Config, pipeline: Arc<Pipeline>) -> Result<()> {
    let serializer = Arc::new(RebuildSerializer::new(pipeline));

    serializer.build_now()?;

    let mut watcher = FileWatcher::new(
        &config.content_dir,
        Duration::from_millis(config.debounce_ms),
    )?;

    while let Some(event) = watcher.recv().await {
        tracing::debug!(path = %event.path.display(), kind = ?event.kind, "File event");
        serializer.notify(event);

        let serializer = Arc::clone(&serializer);
        tokio::task::spawn_blocking(move || match serializer.rebuild() {
            Ok(Some(summary)) => {
                tracing::debug!(emitted = summary.emitted_artifact_count, "Rebuild done");
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "Rebuild failed");
            }
        });
    }

    Ok(())
}
