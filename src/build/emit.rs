//! Output-stage coordination and artifact reconciliation.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::graph::{get_node, ContentRecord, NodeKind};
use crate::Result;

/// What happened to a document this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Change,
    Delete,
}

impl ChangeKind {
    /// Lowercase label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Delete => "delete",
        }
    }
}

/// One entry in the per-build change-event log handed to partial stages.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub id: String,
    /// Fresh record for add/change events; absent for deletes.
    pub record: Option<ContentRecord>,
}

/// Context shared by all output stages.
#[derive(Debug, Clone)]
pub struct EmitContext {
    pub output_dir: PathBuf,
}

impl EmitContext {
    /// Artifact path for a document id.
    #[must_use]
    pub fn artifact_path(&self, id: &str) -> PathBuf {
        self.output_dir.join(format!("{id}.html"))
    }
}

/// An output stage.
///
/// Stages that are inherently global (bundling, static copy) implement only
/// [`EmitStage::full`] and are run in full on every pass. Partial-capable
/// stages opt in via [`EmitStage::supports_partial`]; their `partial` may
/// return `Ok(None)` to mean "nothing to do this pass", which skips the
/// stage rather than falling back to a full recompute.
pub trait EmitStage: Send + Sync {
    /// Stage name for logs.
    fn name(&self) -> &'static str;

    /// Whether this stage implements an incremental operation.
    fn supports_partial(&self) -> bool {
        false
    }

    /// Recompute every artifact from the complete record set.
    ///
    /// # Errors
    ///
    /// Returns an error if emission fails.
    fn full(&self, ctx: &EmitContext, records: &[ContentRecord]) -> Result<Vec<PathBuf>>;

    /// Emit only the artifacts implied by the change-event log.
    ///
    /// Only called when [`EmitStage::supports_partial`] is true. `Ok(None)`
    /// means the stage has nothing to emit for this change set.
    ///
    /// # Errors
    ///
    /// Returns an error if emission fails.
    fn partial(
        &self,
        ctx: &EmitContext,
        records: &[ContentRecord],
        events: &[ChangeEvent],
    ) -> Result<Option<Vec<PathBuf>>> {
        let _ = (ctx, records, events);
        Ok(None)
    }
}

/// Build lifecycle phases, logged per transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Idle,
    Scanning,
    NoOp,
    GraphUpdating,
    Reconstructing,
    Emitting,
    Reconciling,
}

impl BuildPhase {
    /// Lowercase label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::NoOp => "noop",
            Self::GraphUpdating => "graph-updating",
            Self::Reconstructing => "reconstructing",
            Self::Emitting => "emitting",
            Self::Reconciling => "reconciling",
        }
    }
}

/// Per-build summary for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub changed_count: usize,
    pub deleted_count: usize,
    pub emitted_artifact_count: usize,
    pub elapsed_ms: u64,
}

/// Run every registered stage, choosing full vs partial emission.
///
/// On an incremental pass a partial-capable stage runs its partial
/// operation; `Ok(None)` skips the stage for this pass. Stages without
/// partial support, and every stage on a non-incremental pass, run in full.
///
/// # Errors
///
/// Returns the first stage error encountered.
pub fn emit_all(
    stages: &[Box<dyn EmitStage>],
    ctx: &EmitContext,
    records: &[ContentRecord],
    events: &[ChangeEvent],
    incremental: bool,
) -> Result<usize> {
    let mut emitted = 0;

    for stage in stages {
        let artifacts = if incremental && stage.supports_partial() {
            match stage.partial(ctx, records, events)? {
                Some(artifacts) => {
                    tracing::debug!(stage = stage.name(), count = artifacts.len(), "Partial emit");
                    artifacts
                }
                None => {
                    tracing::debug!(stage = stage.name(), "Nothing to emit, skipping");
                    continue;
                }
            }
        } else {
            let artifacts = stage.full(ctx, records)?;
            tracing::debug!(stage = stage.name(), count = artifacts.len(), "Full emit");
            artifacts
        };

        emitted += artifacts.len();
    }

    Ok(emitted)
}

/// Reconcile on-disk artifacts for deleted ids.
///
/// An id that degraded to a virtual node keeps its artifact (it now serves
/// the placeholder page); a fully removed id has its artifact deleted.
/// Missing-file deletion errors are swallowed, not fatal.
///
/// # Errors
///
/// Returns an error if the graph cannot be read.
pub fn reconcile_artifacts(
    conn: &Connection,
    ctx: &EmitContext,
    deleted_ids: &[String],
) -> Result<usize> {
    let mut removed = 0;

    for id in deleted_ids {
        let is_virtual =
            get_node(conn, id)?.is_some_and(|node| node.kind() == NodeKind::Virtual);

        if is_virtual {
            tracing::debug!(id, "Keeping artifact for virtual placeholder");
            continue;
        }

        let path = ctx.artifact_path(id);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(id, path = %path.display(), "Removed artifact");
                removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(id, error = %e, "Failed to remove artifact");
            }
        }
    }

    Ok(removed)
}

/// Write an artifact, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the write fails.
pub fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}
