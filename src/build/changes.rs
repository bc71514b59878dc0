//! Change detection against the stored graph.

use std::collections::BTreeMap;

use rusqlite::Connection;

use crate::graph::{doc_id, entity_mtimes, entity_path};
use crate::Result;

/// Result of diffing the current scan against the stored graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Relative paths that are new or modified.
    pub changed: Vec<String>,
    /// Relative paths whose stored entity no longer exists on disk.
    pub deleted: Vec<String>,
}

impl ChangeSet {
    /// True when nothing changed and nothing was deleted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty()
    }
}

/// Diff current file mtimes against stored entity state.
///
/// A current path whose stored entity is absent or carries a different mtime
/// is changed (covers both new and modified files). A stored entity whose
/// expected path is missing from the scan is deleted. Runs in
/// O(files + stored entities).
///
/// # Errors
///
/// Returns an error if the stored entity state cannot be read.
pub fn detect_changes(conn: &Connection, current: &BTreeMap<String, i64>) -> Result<ChangeSet> {
    let stored = entity_mtimes(conn)?;

    let mut changed = Vec::new();
    for (path, mtime) in current {
        let id = doc_id(path);
        if stored.get(&id) != Some(mtime) {
            changed.push(path.clone());
        }
    }

    let mut deleted: Vec<String> = stored
        .keys()
        .map(|id| entity_path(id))
        .filter(|path| !current.contains_key(path))
        .collect();
    deleted.sort();

    Ok(ChangeSet { changed, deleted })
}
