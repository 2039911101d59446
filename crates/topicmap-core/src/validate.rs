//! Structural invariant checks run after every transformation

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StructureError};
use crate::model::{EntryPath, RefId, StructureGraph};

/// A single broken invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Violation {
    DuplicateRef(RefId),
    MissingDocument(RefId),
    OrphanDocument(RefId),
    MislabelledDocument { key: RefId, found: RefId },
    EmptyContainer { path: EntryPath, title: String },
    DanglingReference { source_ref: RefId, target: RefId },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::DuplicateRef(r) => write!(f, "ref id '{}' appears more than once", r),
            Violation::MissingDocument(r) => write!(f, "ref id '{}' has no content document", r),
            Violation::OrphanDocument(r) => write!(f, "document '{}' is not referenced by the map", r),
            Violation::MislabelledDocument { key, found } => {
                write!(f, "document stored under '{}' claims id '{}'", key, found)
            }
            Violation::EmptyContainer { path, title } => {
                write!(f, "container '{}' at {} has no children", title, path)
            }
            Violation::DanglingReference { source_ref, target } => {
                write!(f, "'{}' references missing '{}'", source_ref, target)
            }
        }
    }
}

/// Collect every violation in `graph`. An empty result means the graph is
/// referentially complete and has no childless containers.
pub fn check(graph: &StructureGraph) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut seen: HashSet<&RefId> = HashSet::new();

    graph.walk(|path, _, entry| match &entry.ref_id {
        Some(ref_id) => {
            if !seen.insert(ref_id) {
                violations.push(Violation::DuplicateRef(ref_id.clone()));
            }
            if !graph.documents.contains_key(ref_id) {
                violations.push(Violation::MissingDocument(ref_id.clone()));
            }
        }
        None => {
            if entry.children.is_empty() {
                violations.push(Violation::EmptyContainer {
                    path: path.clone(),
                    title: entry.title.clone(),
                });
            }
        }
    });

    for (key, doc) in &graph.documents {
        if !seen.contains(key) {
            violations.push(Violation::OrphanDocument(key.clone()));
        }
        if &doc.ref_id != key {
            violations.push(Violation::MislabelledDocument {
                key: key.clone(),
                found: doc.ref_id.clone(),
            });
        }
        for target in doc.cross_refs() {
            if !graph.documents.contains_key(target) {
                violations.push(Violation::DanglingReference {
                    source_ref: key.clone(),
                    target: target.clone(),
                });
            }
        }
    }

    violations
}

/// Fail with [`StructureError::MergeValidation`] unless `graph` is clean.
pub fn ensure_valid(graph: &StructureGraph) -> Result<()> {
    let violations = check(graph);
    if violations.is_empty() {
        Ok(())
    } else {
        tracing::error!("structure graph failed validation with {} violation(s)", violations.len());
        Err(StructureError::MergeValidation(violations))
    }
}
