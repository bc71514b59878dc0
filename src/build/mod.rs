//! Incremental build lifecycle.
//!
//! A build pass scans the content tree, diffs it against the stored graph,
//! applies the delta transactionally, reconstructs the full logical record
//! set, and hands it to the output stages.

pub mod changes;
pub mod emit;
pub mod pipeline;
pub mod reconstruct;
pub mod scan;
pub mod stages;
pub mod update;

pub use changes::{detect_changes, ChangeSet};
pub use emit::{
    emit_all, reconcile_artifacts, write_artifact, BuildPhase, BuildSummary, ChangeEvent,
    ChangeKind, EmitContext, EmitStage,
};
pub use pipeline::Pipeline;
pub use reconstruct::reconstruct;
pub use scan::scan_content;
pub use stages::{ContentIndexStage, ContentPageStage, StaticCopyStage, VirtualPageStage};
pub use update::{apply_changes, fix_entity_mtimes};
