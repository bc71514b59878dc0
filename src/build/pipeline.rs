//! The build coordinator.
//!
//! One `run` is a full pass through the lifecycle: scan, diff, graph
//! update, record reconstruction, emission, reconciliation. Every pass
//! over an unchanged tree is a no-op that touches no artifacts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::build::changes::{detect_changes, ChangeSet};
use crate::build::emit::{
    emit_all, reconcile_artifacts, BuildPhase, BuildSummary, ChangeEvent, ChangeKind, EmitContext,
    EmitStage,
};
use crate::build::reconstruct::reconstruct;
use crate::build::scan::scan_content;
use crate::build::update::{apply_changes, fix_entity_mtimes};
use crate::config::Config;
use crate::graph::{
    clear_all, doc_id, entity_mtimes, root_fingerprint, store_root_fingerprint,
    stored_root_fingerprint, Document, GraphStore,
};
use crate::parse::Parser;
use crate::Result;

/// Owns the store, the parser, and the registered output stages.
pub struct Pipeline {
    config: Config,
    store: GraphStore,
    parser: Box<dyn Parser>,
    stages: Vec<Box<dyn EmitStage>>,
    reset_requested: AtomicBool,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        config: Config,
        store: GraphStore,
        parser: Box<dyn Parser>,
        stages: Vec<Box<dyn EmitStage>>,
    ) -> Self {
        let reset_requested = AtomicBool::new(config.reset);
        Self {
            config,
            store,
            parser,
            stages,
            reset_requested,
        }
    }

    /// Run one build pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph update or emission fails. Per-document
    /// parse failures are logged and skipped, not fatal.
    pub fn run(&self) -> Result<BuildSummary> {
        let started = Instant::now();
        tracing::debug!(phase = BuildPhase::Scanning.as_str(), "Build started");

        let fresh_cache = self.invalidate_if_needed()?;

        let current = scan_content(&self.config.content_dir)?;
        let changes = self
            .store
            .with_conn(|conn| detect_changes(conn, &current))?;

        if changes.is_empty() && !fresh_cache {
            tracing::info!(phase = BuildPhase::NoOp.as_str(), "Nothing to do");
            return Ok(BuildSummary {
                elapsed_ms: elapsed_ms(started),
                ..BuildSummary::default()
            });
        }

        tracing::info!(
            phase = BuildPhase::GraphUpdating.as_str(),
            changed = changes.changed.len(),
            deleted = changes.deleted.len(),
            "Applying changes"
        );

        let parsed = self.parse_changed(&changes);
        let deleted_ids: Vec<String> = changes.deleted.iter().map(|p| doc_id(p)).collect();

        // Snapshot stored entity ids before the update so add vs change
        // events can be told apart afterwards.
        let known = self.store.with_conn(entity_mtimes)?;

        apply_changes(&self.store, &parsed, &deleted_ids)?;
        fix_entity_mtimes(&self.store, &self.config.content_dir, &parsed)?;

        tracing::debug!(phase = BuildPhase::Reconstructing.as_str(), "Reconstructing records");
        let records = self
            .store
            .with_read_conn(|conn| reconstruct(conn, &parsed))?;

        let mut events: Vec<ChangeEvent> = parsed
            .iter()
            .map(|d| {
                let id = d.id();
                let kind = if known.contains_key(&id) {
                    ChangeKind::Change
                } else {
                    ChangeKind::Add
                };
                let record = records.iter().find(|r| r.id == id).cloned();
                ChangeEvent { kind, id, record }
            })
            .collect();
        events.extend(deleted_ids.iter().map(|id| ChangeEvent {
            kind: ChangeKind::Delete,
            id: id.clone(),
            record: None,
        }));

        tracing::debug!(phase = BuildPhase::Emitting.as_str(), "Emitting artifacts");
        let ctx = EmitContext {
            output_dir: self.config.output_dir.clone(),
        };
        let emitted = emit_all(&self.stages, &ctx, &records, &events, !fresh_cache)?;

        tracing::debug!(phase = BuildPhase::Reconciling.as_str(), "Reconciling artifacts");
        self.store
            .with_read_conn(|conn| reconcile_artifacts(conn, &ctx, &deleted_ids))?;

        let summary = BuildSummary {
            changed_count: changes.changed.len(),
            deleted_count: changes.deleted.len(),
            emitted_artifact_count: emitted,
            elapsed_ms: elapsed_ms(started),
        };
        tracing::info!(
            changed = summary.changed_count,
            deleted = summary.deleted_count,
            emitted = summary.emitted_artifact_count,
            elapsed_ms = summary.elapsed_ms,
            "Build complete"
        );
        Ok(summary)
    }

    /// Invalidate the cache when requested or when the content root moved.
    ///
    /// Returns true when this pass starts from an empty graph, which forces
    /// full emission.
    fn invalidate_if_needed(&self) -> Result<bool> {
        let fingerprint = root_fingerprint(&self.config.content_dir);
        let stored = self.store.with_conn(stored_root_fingerprint)?;

        let reset = self.reset_requested.swap(false, Ordering::SeqCst);
        let moved = stored.as_deref().is_some_and(|s| s != fingerprint);

        if reset || moved {
            tracing::info!(
                reset,
                moved,
                "Invalidating graph cache and output directory"
            );
            self.store.with_conn(clear_all)?;
            match std::fs::remove_dir_all(&self.config.output_dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        let fresh = reset || moved || stored.is_none();
        self.store
            .with_conn(|conn| store_root_fingerprint(conn, &fingerprint))?;
        Ok(fresh)
    }

    /// Parse every changed path, dropping documents that fail to parse.
    fn parse_changed(&self, changes: &ChangeSet) -> Vec<Document> {
        let mut parsed = Vec::with_capacity(changes.changed.len());
        for path in &changes.changed {
            match self.parser.parse(&self.config.content_dir, path) {
                Ok(doc) => parsed.push(doc),
                Err(e) => {
                    tracing::warn!(path, error = %e, "Skipping unparseable document");
                }
            }
        }
        parsed
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::stages::{ContentIndexStage, ContentPageStage, VirtualPageStage};
    use crate::graph::{get_node, migrate, NodeKind};
    use crate::parse::MarkdownParser;
    use std::fs;
    use tempfile::TempDir;

    fn pipeline(tmp: &TempDir) -> Pipeline {
        let config = Config {
            content_dir: tmp.path().join("content"),
            output_dir: tmp.path().join("public"),
            data_dir: tmp.path().join("data"),
            ..Config::default()
        };
        fs::create_dir_all(&config.content_dir).unwrap();

        let store = GraphStore::open_in_memory().unwrap();
        store.with_conn(migrate).unwrap();

        Pipeline::new(
            config,
            store.clone(),
            Box::new(MarkdownParser::new()),
            vec![
                Box::new(ContentPageStage),
                Box::new(VirtualPageStage::new(store)),
                Box::new(ContentIndexStage),
            ],
        )
    }

    #[test]
    fn test_first_build_emits_everything() {
        let tmp = TempDir::new().unwrap();
        let p = pipeline(&tmp);
        fs::write(
            p.config.content_dir.join("a.md"),
            "---\ntitle: A\n---\nhello [[b]]",
        )
        .unwrap();
        fs::write(p.config.content_dir.join("b.md"), "world").unwrap();

        let summary = p.run().unwrap();
        assert_eq!(summary.changed_count, 2);
        assert!(p.config.output_dir.join("a.html").exists());
        assert!(p.config.output_dir.join("b.html").exists());
        assert!(p.config.output_dir.join("index.json").exists());
    }

    #[test]
    fn test_second_build_is_noop() {
        let tmp = TempDir::new().unwrap();
        let p = pipeline(&tmp);
        fs::write(p.config.content_dir.join("a.md"), "hello").unwrap();

        p.run().unwrap();
        let summary = p.run().unwrap();
        assert_eq!(summary.changed_count, 0);
        assert_eq!(summary.deleted_count, 0);
        assert_eq!(summary.emitted_artifact_count, 0);
    }

    #[test]
    fn test_unparseable_document_skipped_siblings_survive() {
        let tmp = TempDir::new().unwrap();
        let p = pipeline(&tmp);
        fs::write(p.config.content_dir.join("good.md"), "fine").unwrap();
        fs::write(
            p.config.content_dir.join("bad.md"),
            "---\ntitle: [unclosed\n---\nbody",
        )
        .unwrap();

        p.run().unwrap();
        assert!(p.config.output_dir.join("good.html").exists());
        assert!(!p.config.output_dir.join("bad.html").exists());
    }

    #[test]
    fn test_delete_removes_artifact_and_node() {
        let tmp = TempDir::new().unwrap();
        let p = pipeline(&tmp);
        let path = p.config.content_dir.join("gone.md");
        fs::write(&path, "temporary").unwrap();
        p.run().unwrap();
        assert!(p.config.output_dir.join("gone.html").exists());

        fs::remove_file(&path).unwrap();
        let summary = p.run().unwrap();
        assert_eq!(summary.deleted_count, 1);
        assert!(!p.config.output_dir.join("gone.html").exists());
        p.store
            .with_conn(|conn| {
                assert!(get_node(conn, "gone")?.is_none());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_delete_linked_entity_gets_placeholder_page() {
        let tmp = TempDir::new().unwrap();
        let p = pipeline(&tmp);
        fs::write(p.config.content_dir.join("a.md"), "see [[b]]").unwrap();
        let b = p.config.content_dir.join("b.md");
        fs::write(&b, "target").unwrap();
        p.run().unwrap();

        fs::remove_file(&b).unwrap();
        p.run().unwrap();

        // b degraded to a virtual placeholder; its page is now a stub
        // listing the referrer.
        p.store
            .with_conn(|conn| {
                assert_eq!(get_node(conn, "b")?.unwrap().kind(), NodeKind::Virtual);
                Ok(())
            })
            .unwrap();
        let stub = fs::read_to_string(p.config.output_dir.join("b.html")).unwrap();
        assert!(stub.contains("does not exist yet"));
        assert!(stub.contains("a.html"));
    }

    #[test]
    fn test_dangling_link_gets_stub_page() {
        let tmp = TempDir::new().unwrap();
        let p = pipeline(&tmp);
        fs::write(p.config.content_dir.join("a.md"), "see [[ghost]]").unwrap();
        p.run().unwrap();

        // ghost never had a backing document but still gets a page.
        let stub = fs::read_to_string(p.config.output_dir.join("ghost.html")).unwrap();
        assert!(stub.contains("does not exist yet"));
        assert!(stub.contains("a.html"));
    }

    #[test]
    fn test_reset_clears_output_once() {
        let tmp = TempDir::new().unwrap();
        let mut p = pipeline(&tmp);
        fs::write(p.config.content_dir.join("a.md"), "hello").unwrap();
        p.run().unwrap();

        fs::write(p.config.output_dir.join("stale.html"), "stale").unwrap();
        p.config.reset = true;
        p.reset_requested.store(true, Ordering::SeqCst);

        p.run().unwrap();
        assert!(!p.config.output_dir.join("stale.html").exists());
        assert!(p.config.output_dir.join("a.html").exists());

        // The reset applies to the first pass only.
        fs::write(p.config.output_dir.join("kept.html"), "kept").unwrap();
        p.run().unwrap();
        assert!(p.config.output_dir.join("kept.html").exists());
    }
}
