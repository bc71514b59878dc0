//! Rebuild serialization.
//!
//! At most one build runs at a time. Events arriving mid-build accumulate in
//! the pending set; a rebuild request that finds a newer request already
//! stamped gives way instead of building on a stale view. A superseded
//! request loses nothing: the pending set survives to the winning rebuild,
//! which therefore covers the union of both change bursts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::events::{PendingChanges, WatchEvent};
use crate::build::{BuildSummary, Pipeline};
use crate::Result;

pub struct RebuildSerializer {
    pipeline: Arc<Pipeline>,
    pending: Mutex<PendingChanges>,
    generation: AtomicU64,
    build_lock: Mutex<()>,
}

impl RebuildSerializer {
    #[must_use]
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            pending: Mutex::new(PendingChanges::new()),
            generation: AtomicU64::new(0),
            build_lock: Mutex::new(()),
        }
    }

    /// Record an event without triggering anything.
    pub fn notify(&self, event: WatchEvent) {
        self.pending.lock().record(event);
    }

    /// Run one rebuild over everything pending.
    ///
    /// Returns `Ok(None)` when this request was superseded by a newer one or
    /// when nothing was pending by the time the lock was acquired.
    ///
    /// # Errors
    ///
    /// Returns an error if the build pass fails.
    pub fn rebuild(&self) -> Result<Option<BuildSummary>> {
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let _guard = self.build_lock.lock();

        // A newer request arrived while we waited; it will see our pending
        // events too, so this one steps aside.
        if self.generation.load(Ordering::SeqCst) != my_generation {
            tracing::debug!(generation = my_generation, "Rebuild superseded");
            return Ok(None);
        }

        let drained = self.pending.lock().drain();
        if drained.is_empty() {
            return Ok(None);
        }

        tracing::info!(events = drained.len(), "Rebuilding");
        let summary = self.pipeline.run()?;
        Ok(Some(summary))
    }

    /// Run a build unconditionally, outside the event flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the build pass fails.
    pub fn build_now(&self) -> Result<BuildSummary> {
        let _guard = self.build_lock.lock();
        self.pending.lock().drain();
        self.pipeline.run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{ContentPageStage, EmitStage};
    use crate::config::Config;
    use crate::graph::{migrate, GraphStore};
    use crate::parse::MarkdownParser;
    use crate::watch::events::WatchEventKind;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn serializer(tmp: &TempDir) -> RebuildSerializer {
        let config = Config {
            content_dir: tmp.path().join("content"),
            output_dir: tmp.path().join("public"),
            data_dir: tmp.path().join("data"),
            ..Config::default()
        };
        std::fs::create_dir_all(&config.content_dir).unwrap();

        let store = GraphStore::open_in_memory().unwrap();
        store.with_conn(migrate).unwrap();

        let stages: Vec<Box<dyn EmitStage>> = vec![Box::new(ContentPageStage)];
        let pipeline = Pipeline::new(config, store, Box::new(MarkdownParser::new()), stages);
        RebuildSerializer::new(Arc::new(pipeline))
    }

    #[test]
    fn test_rebuild_with_nothing_pending_is_none() {
        let tmp = TempDir::new().unwrap();
        let s = serializer(&tmp);
        assert!(s.rebuild().unwrap().is_none());
    }

    #[test]
    fn test_rebuild_drains_pending() {
        let tmp = TempDir::new().unwrap();
        let s = serializer(&tmp);
        std::fs::write(tmp.path().join("content/a.md"), "hello").unwrap();

        s.notify(WatchEvent {
            path: PathBuf::from("a.md"),
            kind: WatchEventKind::Change,
        });

        let summary = s.rebuild().unwrap().unwrap();
        assert_eq!(summary.changed_count, 1);

        // Pending set was drained; nothing left to build.
        assert!(s.rebuild().unwrap().is_none());
    }

    #[test]
    fn test_coalesced_burst_builds_once() {
        let tmp = TempDir::new().unwrap();
        let s = serializer(&tmp);
        std::fs::write(tmp.path().join("content/a.md"), "hello").unwrap();

        for _ in 0..3 {
            s.notify(WatchEvent {
                path: PathBuf::from("a.md"),
                kind: WatchEventKind::Change,
            });
        }

        assert!(s.rebuild().unwrap().is_some());
        assert!(s.rebuild().unwrap().is_none());
    }
}
