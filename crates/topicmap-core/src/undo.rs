//! Snapshot history with undo/redo
//!
//! The history is linear: committing after an undo discards everything past
//! the cursor. Each snapshot owns a deep copy of its graph, so nothing
//! committed can be changed through a live graph afterwards.
//!
//! A filtered snapshot keeps the unfiltered graph it was merged from next
//! to the merged view. The next filter starts from that base again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{ExclusionSpec, StructureGraph};

/// Default number of snapshots kept (0 = unlimited).
pub const DEFAULT_HISTORY_LIMIT: usize = 0;

/// A committed filter and the graph it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FilterView {
    spec: ExclusionSpec,
    graph: StructureGraph,
}

/// An immutable copy of the structure at one point in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Monotonically increasing across the lifetime of the service.
    pub sequence: u64,
    /// What produced this state ("import", "rename 1.2 to …").
    pub label: String,
    pub taken_at: DateTime<Utc>,
    /// Unfiltered structure.
    base: StructureGraph,
    view: Option<FilterView>,
}

impl Snapshot {
    fn capture(base: &StructureGraph, view: Option<FilterView>, sequence: u64, label: &str) -> Self {
        Snapshot {
            sequence,
            label: label.to_string(),
            taken_at: Utc::now(),
            base: base.clone(),
            view,
        }
    }

    /// The active graph: the filtered view when a filter is committed.
    pub fn graph(&self) -> &StructureGraph {
        match &self.view {
            Some(view) => &view.graph,
            None => &self.base,
        }
    }

    /// The graph before any committed filter.
    pub fn base(&self) -> &StructureGraph {
        &self.base
    }

    pub fn filter(&self) -> Option<&ExclusionSpec> {
        self.view.as_ref().map(|view| &view.spec)
    }
}

/// Linear undo/redo history for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoService {
    history: Vec<Snapshot>,
    /// Index of the active snapshot; meaningless while `history` is empty.
    cursor: usize,
    next_sequence: u64,
    /// Maximum snapshots kept (0 = unlimited).
    max_levels: usize,
}

impl UndoService {
    pub fn new() -> Self {
        Self::with_max_levels(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        UndoService {
            history: Vec::new(),
            cursor: 0,
            next_sequence: 0,
            max_levels,
        }
    }

    /// Record `graph` as the new active, unfiltered state.
    pub fn commit(&mut self, graph: &StructureGraph, label: &str) -> &Snapshot {
        self.push(graph, None, label)
    }

    /// Record `filtered`, produced by applying `spec` to `base`, as the new
    /// active state. `base` stays available through [`Snapshot::base`].
    pub fn commit_filtered(
        &mut self,
        base: &StructureGraph,
        spec: &ExclusionSpec,
        filtered: StructureGraph,
        label: &str,
    ) -> &Snapshot {
        let view = FilterView {
            spec: spec.clone(),
            graph: filtered,
        };
        self.push(base, Some(view), label)
    }

    fn push(&mut self, base: &StructureGraph, view: Option<FilterView>, label: &str) -> &Snapshot {
        if !self.history.is_empty() {
            self.history.truncate(self.cursor + 1);
        }
        let snapshot = Snapshot::capture(base, view, self.next_sequence, label);
        self.next_sequence += 1;
        self.history.push(snapshot);

        if self.max_levels > 0 && self.history.len() > self.max_levels {
            let excess = self.history.len() - self.max_levels;
            self.history.drain(..excess);
        }
        self.cursor = self.history.len() - 1;
        debug!("Committed snapshot #{} ({})", self.history[self.cursor].sequence, label);
        &self.history[self.cursor]
    }

    /// Step back one snapshot. `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            debug!("Nothing to undo");
            return None;
        }
        self.cursor -= 1;
        Some(&self.history[self.cursor])
    }

    /// Step forward one snapshot. `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            debug!("Nothing to redo");
            return None;
        }
        self.cursor += 1;
        Some(&self.history[self.cursor])
    }

    /// The active snapshot.
    pub fn current(&self) -> Option<&Snapshot> {
        self.history.get(self.cursor)
    }

    pub fn current_graph(&self) -> Option<&StructureGraph> {
        self.current().map(Snapshot::graph)
    }

    pub fn current_base(&self) -> Option<&StructureGraph> {
        self.current().map(Snapshot::base)
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty() && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.history.len()
    }

    /// Label of the edit the next undo would revert.
    pub fn undo_label(&self) -> Option<&str> {
        if self.can_undo() {
            self.current().map(|s| s.label.as_str())
        } else {
            None
        }
    }

    /// Label of the edit the next redo would reapply.
    pub fn redo_label(&self) -> Option<&str> {
        self.history.get(self.cursor + 1).map(|s| s.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.cursor = 0;
    }
}

impl Default for UndoService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::rename;
    use crate::model::EntryPath;
    use crate::test_utils::*;

    #[test]
    fn test_empty_service() {
        let mut undo = UndoService::new();
        assert!(undo.current().is_none());
        assert!(undo.undo().is_none());
        assert!(undo.redo().is_none());
    }

    #[test]
    fn test_n_edits_then_n_undos_restores_start() {
        let start = book_graph();
        let mut undo = UndoService::new();
        undo.commit(&start, "import");

        let mut graph = start.clone();
        for i in 0..4 {
            graph = rename(&graph, &EntryPath(vec![0, 0]), &format!("Alpha v{}", i)).unwrap();
            undo.commit(&graph, "rename");
        }
        for _ in 0..4 {
            assert!(undo.undo().is_some());
        }
        assert_eq!(undo.current_graph(), Some(&start));
        assert!(undo.undo().is_none());
    }

    #[test]
    fn test_undos_then_redos_return_to_latest() {
        let mut undo = UndoService::new();
        let mut graph = book_graph();
        undo.commit(&graph, "import");
        for i in 0..3 {
            graph = rename(&graph, &EntryPath(vec![1]), &format!("Part {}", i)).unwrap();
            undo.commit(&graph, "rename");
        }
        let latest = graph.clone();

        undo.undo();
        undo.undo();
        assert_eq!(undo.redo_label(), Some("rename"));
        undo.redo();
        undo.redo();
        assert_eq!(undo.current_graph(), Some(&latest));
        assert!(undo.redo().is_none());
    }

    #[test]
    fn test_commit_after_undo_truncates() {
        let mut undo = UndoService::new();
        let graph = book_graph();
        undo.commit(&graph, "a");
        undo.commit(&graph, "b");
        undo.commit(&graph, "c");
        undo.undo();
        undo.undo();
        undo.commit(&graph, "d");

        let labels: Vec<_> = undo.history().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "d"]);
        assert!(!undo.can_redo());
        assert_eq!(undo.current().unwrap().sequence, 3);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut undo = UndoService::with_max_levels(2);
        let graph = book_graph();
        undo.commit(&graph, "a");
        undo.commit(&graph, "b");
        undo.commit(&graph, "c");
        assert_eq!(undo.len(), 2);
        assert_eq!(undo.history()[0].label, "b");
        assert_eq!(undo.undo_label(), Some("c"));
    }

    #[test]
    fn test_default_keeps_every_snapshot() {
        let start = chain_graph();
        let mut undo = UndoService::default();
        undo.commit(&start, "import");

        let mut graph = start.clone();
        for i in 0..150 {
            graph = rename(&graph, &EntryPath::top(0), &format!("H1 v{}", i)).unwrap();
            undo.commit(&graph, "rename");
        }
        assert_eq!(undo.len(), 151);
        for _ in 0..150 {
            assert!(undo.undo().is_some());
        }
        assert_eq!(undo.current_graph(), Some(&start));
        assert!(!undo.can_undo());
    }

    #[test]
    fn test_filtered_snapshot_keeps_base() {
        let base = chain_graph();
        let spec = ExclusionSpec::new().with_max_depth(1);
        let filtered = crate::merge::merge(&base, &spec).unwrap();
        let mut undo = UndoService::new();
        undo.commit(&base, "import");
        undo.commit_filtered(&base, &spec, filtered.clone(), "filter");

        let snapshot = undo.current().unwrap();
        assert_eq!(snapshot.graph(), &filtered);
        assert_eq!(snapshot.base(), &base);
        assert_eq!(snapshot.filter(), Some(&spec));

        undo.undo();
        assert_eq!(undo.current().unwrap().filter(), None);
        assert_eq!(undo.current_graph(), undo.current_base());
    }

    #[test]
    fn test_snapshot_is_independent_of_live_graph() {
        let mut undo = UndoService::new();
        let mut graph = book_graph();
        undo.commit(&graph, "import");
        graph.entries.clear();
        assert_eq!(undo.current_graph().unwrap().entries.len(), 2);
    }
}
