//! Read-only projections over a structure graph for filter panels

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::model::*;

/// One entry carrying a given classification key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub path: EntryPath,
    pub title: String,
    pub depth: usize,
    pub ref_id: Option<RefId>,
}

/// Number of entries per classification key.
pub fn counts_by_classification_key(graph: &StructureGraph) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    graph.walk(|_, _, entry| {
        *counts.entry(entry.classification_key.clone()).or_insert(0) += 1;
    });
    counts
}

/// Distinct outline levels seen for each classification key.
pub fn levels_by_classification_key(graph: &StructureGraph) -> BTreeMap<String, BTreeSet<u32>> {
    let mut levels: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
    graph.walk(|_, _, entry| {
        levels
            .entry(entry.classification_key.clone())
            .or_default()
            .insert(entry.level);
    });
    levels
}

/// Every entry per classification key, in map order.
pub fn occurrences_by_classification_key(graph: &StructureGraph) -> BTreeMap<String, Vec<Occurrence>> {
    let mut occurrences: BTreeMap<String, Vec<Occurrence>> = BTreeMap::new();
    graph.walk(|path, depth, entry| {
        occurrences
            .entry(entry.classification_key.clone())
            .or_default()
            .push(Occurrence {
                path: path.clone(),
                title: entry.title.clone(),
                depth,
                ref_id: entry.ref_id.clone(),
            });
    });
    occurrences
}

/// Everything a filter panel shows at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureStats {
    pub units: usize,
    pub containers: usize,
    pub max_depth: usize,
    pub counts: BTreeMap<String, usize>,
    pub levels: BTreeMap<String, BTreeSet<u32>>,
}

pub fn stats(graph: &StructureGraph) -> StructureStats {
    StructureStats {
        units: graph.unit_count(),
        containers: graph.container_count(),
        max_depth: graph.max_depth(),
        counts: counts_by_classification_key(graph),
        levels: levels_by_classification_key(graph),
    }
}
