//! Filesystem event types and per-path coalescing.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Classified filesystem event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventKind {
    Add,
    Change,
    Delete,
}

/// One debounced filesystem event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchEventKind,
}

/// Coalesces bursts of events per path while a build is in flight.
///
/// The last event wins per path, with one exception: an add followed by
/// edits stays an add, since the file is still new to the build.
#[derive(Debug, Default)]
pub struct PendingChanges {
    by_path: BTreeMap<PathBuf, WatchEventKind>,
}

impl PendingChanges {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the pending set.
    pub fn record(&mut self, event: WatchEvent) {
        use WatchEventKind::{Add, Change};

        let kind = match (self.by_path.get(&event.path), event.kind) {
            (Some(Add), Change) => Add,
            (_, kind) => kind,
        };
        self.by_path.insert(event.path, kind);
    }

    /// Take every pending event, leaving the set empty.
    pub fn drain(&mut self) -> Vec<WatchEvent> {
        std::mem::take(&mut self.by_path)
            .into_iter()
            .map(|(path, kind)| WatchEvent { path, kind })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(path: &str, kind: WatchEventKind) -> WatchEvent {
        WatchEvent {
            path: PathBuf::from(path),
            kind,
        }
    }

    #[test]
    fn test_add_then_change_stays_add() {
        let mut pending = PendingChanges::new();
        pending.record(event("a.md", WatchEventKind::Add));
        pending.record(event("a.md", WatchEventKind::Change));

        let drained = pending.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].kind, WatchEventKind::Add);
    }

    #[test]
    fn test_change_then_delete_collapses_to_delete() {
        let mut pending = PendingChanges::new();
        pending.record(event("a.md", WatchEventKind::Change));
        pending.record(event("a.md", WatchEventKind::Delete));

        let drained = pending.drain();
        assert_eq!(drained[0].kind, WatchEventKind::Delete);
    }

    #[test]
    fn test_delete_then_recreate_is_add() {
        let mut pending = PendingChanges::new();
        pending.record(event("a.md", WatchEventKind::Delete));
        pending.record(event("a.md", WatchEventKind::Add));

        let drained = pending.drain();
        assert_eq!(drained[0].kind, WatchEventKind::Add);
    }

    #[test]
    fn test_paths_are_independent() {
        let mut pending = PendingChanges::new();
        pending.record(event("a.md", WatchEventKind::Change));
        pending.record(event("b.md", WatchEventKind::Delete));

        let drained = pending.drain();
        assert_eq!(drained.len(), 2);
        assert!(pending.is_empty());
    }
}
