//! Structure diff computation for reporting edits, undo and redo

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::*;

/// What changed between two structure graphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDiff {
    /// Monotonically increasing diff sequence number.
    pub sequence: u64,
    /// Units present only in the new graph.
    pub added_units: Vec<RefId>,
    /// Units present only in the old graph.
    pub removed_units: Vec<RefId>,
    /// Units whose content document changed.
    pub modified_units: Vec<RefId>,
    /// Units that sit at a different path.
    pub moved_units: Vec<RefId>,
    /// Entries (units or containers) whose title changed in place.
    pub retitled: Vec<EntryPath>,
    pub containers_before: usize,
    pub containers_after: usize,
}

impl GraphDiff {
    /// Create an empty diff with given sequence number.
    pub fn new(sequence: u64) -> Self {
        GraphDiff {
            sequence,
            added_units: Vec::new(),
            removed_units: Vec::new(),
            modified_units: Vec::new(),
            moved_units: Vec::new(),
            retitled: Vec::new(),
            containers_before: 0,
            containers_after: 0,
        }
    }

    /// Check if this diff is empty (no changes).
    pub fn is_empty(&self) -> bool {
        self.added_units.is_empty()
            && self.removed_units.is_empty()
            && self.modified_units.is_empty()
            && self.moved_units.is_empty()
            && self.retitled.is_empty()
            && self.containers_before == self.containers_after
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no structural changes".to_string();
        }
        let mut parts = Vec::new();
        for (count, what) in [
            (self.added_units.len(), "added"),
            (self.removed_units.len(), "removed"),
            (self.modified_units.len(), "modified"),
            (self.moved_units.len(), "moved"),
        ] {
            if count > 0 {
                parts.push(format!("{} unit(s) {}", count, what));
            }
        }
        if !self.retitled.is_empty() {
            parts.push(format!("{} retitled", self.retitled.len()));
        }
        if self.containers_before != self.containers_after {
            parts.push(format!(
                "containers {} -> {}",
                self.containers_before, self.containers_after
            ));
        }
        parts.join(", ")
    }
}

/// Diff state for incremental updates.
#[derive(Debug, Default)]
pub struct DiffEngine {
    sequence: u64,
}

impl DiffEngine {
    pub fn new() -> Self {
        DiffEngine { sequence: 0 }
    }

    /// Compute the difference between two graph states.
    /// Returns a GraphDiff with the sequence number incremented.
    pub fn compute_diff(&mut self, old_graph: &StructureGraph, new_graph: &StructureGraph) -> GraphDiff {
        self.sequence += 1;
        let mut diff = GraphDiff::new(self.sequence);

        let old_paths = unit_paths(old_graph);
        let new_paths = unit_paths(new_graph);

        for (ref_id, path) in &new_paths {
            match old_paths.get(ref_id) {
                None => diff.added_units.push(ref_id.clone()),
                Some(old_path) => {
                    if old_path != path {
                        diff.moved_units.push(ref_id.clone());
                    }
                    if old_graph.documents.get(ref_id) != new_graph.documents.get(ref_id) {
                        diff.modified_units.push(ref_id.clone());
                    }
                }
            }
        }
        for ref_id in old_paths.keys() {
            if !new_paths.contains_key(ref_id) {
                diff.removed_units.push(ref_id.clone());
            }
        }

        new_graph.walk(|path, _, entry| {
            if let Some(old) = old_graph.entry(path) {
                if old.title != entry.title && old.ref_id == entry.ref_id {
                    diff.retitled.push(path.clone());
                }
            }
        });

        diff.containers_before = old_graph.container_count();
        diff.containers_after = new_graph.container_count();
        diff
    }

    /// Get current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

fn unit_paths(graph: &StructureGraph) -> BTreeMap<RefId, EntryPath> {
    let mut out = BTreeMap::new();
    graph.walk(|path, _, entry| {
        if let Some(ref_id) = &entry.ref_id {
            out.insert(ref_id.clone(), path.clone());
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit;
    use crate::test_utils::*;

    #[test]
    fn test_identical_graphs_diff_empty() {
        let graph = book_graph();
        let mut engine = DiffEngine::new();
        let diff = engine.compute_diff(&graph, &graph);
        assert!(diff.is_empty());
        assert_eq!(diff.sequence, 1);
        assert_eq!(diff.summary(), "no structural changes");
    }

    #[test]
    fn test_rename_is_retitle_and_modification() {
        let graph = book_graph();
        let renamed = edit::rename(&graph, &EntryPath(vec![0, 1]), "Bravo").unwrap();
        let diff = DiffEngine::new().compute_diff(&graph, &renamed);
        assert_eq!(diff.retitled, vec![EntryPath(vec![0, 1])]);
        assert_eq!(diff.modified_units, vec![RefId::from("beta")]);
        assert!(diff.moved_units.is_empty());
    }

    #[test]
    fn test_join_reports_removed_and_modified() {
        let graph = book_graph();
        let joined = edit::join_siblings(&graph, &EntryPath(vec![1, 0]), 2).unwrap();
        let mut engine = DiffEngine::new();
        engine.compute_diff(&graph, &graph);
        let diff = engine.compute_diff(&graph, &joined);
        assert_eq!(diff.sequence, 2);
        assert_eq!(diff.removed_units, vec![RefId::from("epsilon")]);
        assert_eq!(diff.modified_units, vec![RefId::from("delta")]);
        assert_eq!(diff.summary(), "1 unit(s) removed, 1 unit(s) modified");
    }
}
