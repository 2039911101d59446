//! Structural edits on a structure graph
//!
//! Every edit maps `&StructureGraph` to a new graph and leaves its input
//! alone, so a failed edit never disturbs the committed state. Results are
//! validated before they are returned.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StructureError};
use crate::merge::{self, rewrite_references};
use crate::model::*;
use crate::validate;

/// A user-level structural edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Edit {
    /// Move an entry `offset` places among its siblings.
    MoveSibling { path: EntryPath, offset: i64 },
    /// Make an entry the next sibling of its parent.
    Promote { path: EntryPath },
    /// Make an entry the last child of its previous sibling.
    Demote { path: EntryPath },
    Rename { path: EntryPath, title: String },
    DeleteSubtree { path: EntryPath },
    /// Fold `count` consecutive sibling units into the first of them.
    JoinSiblings { path: EntryPath, count: usize },
    /// Commit a depth / classification-key filter.
    Filter { spec: ExclusionSpec },
}

impl Edit {
    /// `Filter` merges `graph` as given; a caller showing a filtered view
    /// passes the unfiltered graph behind it, as [`crate::Session`] does.
    pub fn apply(&self, graph: &StructureGraph) -> Result<StructureGraph> {
        match self {
            Edit::MoveSibling { path, offset } => move_sibling(graph, path, *offset),
            Edit::Promote { path } => promote(graph, path),
            Edit::Demote { path } => demote(graph, path),
            Edit::Rename { path, title } => rename(graph, path, title),
            Edit::DeleteSubtree { path } => delete_subtree(graph, path),
            Edit::JoinSiblings { path, count } => join_siblings(graph, path, *count),
            Edit::Filter { spec } => merge::merge(graph, spec),
        }
    }

    /// Short description used as the history label.
    pub fn label(&self) -> String {
        match self {
            Edit::MoveSibling { path, offset } => format!("move {} by {}", path, offset),
            Edit::Promote { path } => format!("promote {}", path),
            Edit::Demote { path } => format!("demote {}", path),
            Edit::Rename { path, title } => format!("rename {} to '{}'", path, title),
            Edit::DeleteSubtree { path } => format!("delete {}", path),
            Edit::JoinSiblings { path, count } => format!("join {} sibling(s) from {}", count, path),
            Edit::Filter { spec } => match spec.max_depth {
                Some(depth) => format!(
                    "filter to depth {} excluding {} key(s)",
                    depth,
                    spec.excluded_classification_keys.len()
                ),
                None => format!("filter excluding {} key(s)", spec.excluded_classification_keys.len()),
            },
        }
    }
}

pub fn move_sibling(graph: &StructureGraph, path: &EntryPath, offset: i64) -> Result<StructureGraph> {
    let mut out = graph.clone();
    let (siblings, idx) = locate(&mut out, path)?;
    let target = idx as i64 + offset;
    if target < 0 || target >= siblings.len() as i64 {
        return Err(StructureError::InvalidEdit(format!(
            "cannot move {} by {}: only {} sibling(s)",
            path,
            offset,
            siblings.len()
        )));
    }
    let entry = siblings.remove(idx);
    siblings.insert(target as usize, entry);
    finish(out)
}

pub fn promote(graph: &StructureGraph, path: &EntryPath) -> Result<StructureGraph> {
    let parent = path
        .parent()
        .filter(|p| !p.is_top())
        .ok_or_else(|| StructureError::InvalidEdit(format!("{} is already at the top level", path)))?;
    let parent_idx = parent.last().unwrap_or_default();

    let mut out = graph.clone();
    let (siblings, idx) = locate(&mut out, path)?;
    if siblings.len() == 1 && parent_is_container(graph, &parent) {
        return Err(empty_container(&parent));
    }
    let mut entry = siblings.remove(idx);
    entry.shift_levels(-1);

    let outer = out
        .siblings_mut(&parent)
        .ok_or_else(|| StructureError::EntryNotFound(parent.clone()))?;
    outer.insert(parent_idx + 1, entry);
    finish(out)
}

pub fn demote(graph: &StructureGraph, path: &EntryPath) -> Result<StructureGraph> {
    let mut out = graph.clone();
    let (siblings, idx) = locate(&mut out, path)?;
    if idx == 0 {
        return Err(StructureError::InvalidEdit(format!(
            "{} has no previous sibling to move under",
            path
        )));
    }
    let mut entry = siblings.remove(idx);
    entry.shift_levels(1);
    siblings[idx - 1].children.push(entry);
    finish(out)
}

pub fn rename(graph: &StructureGraph, path: &EntryPath, title: &str) -> Result<StructureGraph> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StructureError::InvalidEdit("title must not be empty".to_string()));
    }
    let mut out = graph.clone();
    let entry = out
        .entry_mut(path)
        .ok_or_else(|| StructureError::EntryNotFound(path.clone()))?;
    entry.title = title.to_string();
    // The ref id stays put so references keep resolving.
    if let Some(ref_id) = entry.ref_id.clone() {
        if let Some(doc) = out.documents.get_mut(&ref_id) {
            doc.title = title.to_string();
        }
    }
    finish(out)
}

pub fn delete_subtree(graph: &StructureGraph, path: &EntryPath) -> Result<StructureGraph> {
    let mut out = graph.clone();
    let (siblings, idx) = locate(&mut out, path)?;
    if siblings.len() == 1 {
        if let Some(parent) = path.parent().filter(|p| !p.is_top()) {
            if parent_is_container(graph, &parent) {
                return Err(empty_container(&parent));
            }
        }
    }
    let removed = siblings.remove(idx);
    let gone: BTreeSet<RefId> = removed.subtree_refs().into_iter().collect();
    for ref_id in &gone {
        out.documents.remove(ref_id);
    }

    for (key, doc) in &out.documents {
        if let Some(target) = doc.cross_refs().find(|t| gone.contains(*t)) {
            return Err(StructureError::UnresolvedReference {
                source_ref: key.clone(),
                target: target.clone(),
            });
        }
    }
    debug!("Deleted '{}' and {} unit(s)", removed.title, gone.len());
    finish(out)
}

pub fn join_siblings(graph: &StructureGraph, path: &EntryPath, count: usize) -> Result<StructureGraph> {
    if count < 2 {
        return Err(StructureError::InvalidEdit("joining needs at least two entries".to_string()));
    }
    let mut out = graph.clone();
    let (siblings, idx) = locate(&mut out, path)?;
    if idx + count > siblings.len() {
        return Err(StructureError::InvalidEdit(format!(
            "only {} sibling(s) from {}",
            siblings.len() - idx,
            path
        )));
    }
    if let Some(container) = siblings[idx..idx + count].iter().find(|e| e.is_container()) {
        return Err(StructureError::InvalidEdit(format!(
            "'{}' is a container; only units can be joined",
            container.title
        )));
    }

    let mut absorbed: Vec<MapEntry> = siblings.drain(idx + 1..idx + count).collect();
    let keeper = &mut siblings[idx];
    let keeper_ref = keeper
        .ref_id
        .clone()
        .ok_or_else(|| StructureError::InvalidEdit(format!("'{}' has no content", keeper.title)))?;
    for entry in &mut absorbed {
        keeper.children.append(&mut entry.children);
    }

    let mut redirects = HashMap::new();
    let mut appended = Vec::new();
    for entry in absorbed {
        let Some(ref_id) = entry.ref_id else { continue };
        if let Some(doc) = out.documents.remove(&ref_id) {
            appended.push(ContentBlock::MergedTitle {
                title: entry.title,
                level: entry.level,
            });
            appended.extend(doc.blocks);
        }
        redirects.insert(ref_id, Some(keeper_ref.clone()));
    }

    out.documents
        .get_mut(&keeper_ref)
        .ok_or_else(|| StructureError::MergeValidation(vec![validate::Violation::MissingDocument(keeper_ref.clone())]))?
        .blocks
        .extend(appended);
    rewrite_references(&mut out.documents, &redirects)?;
    finish(out)
}

/// The sibling list holding `path` and the entry's index in it.
fn locate<'g>(graph: &'g mut StructureGraph, path: &EntryPath) -> Result<(&'g mut Vec<MapEntry>, usize)> {
    let idx = path
        .last()
        .ok_or_else(|| StructureError::EntryNotFound(path.clone()))?;
    let siblings = graph
        .siblings_mut(path)
        .filter(|s| idx < s.len())
        .ok_or_else(|| StructureError::EntryNotFound(path.clone()))?;
    Ok((siblings, idx))
}

fn parent_is_container(graph: &StructureGraph, parent: &EntryPath) -> bool {
    graph.entry(parent).is_some_and(MapEntry::is_container)
}

fn empty_container(parent: &EntryPath) -> StructureError {
    StructureError::InvalidEdit(format!("container {} would be left without children", parent))
}

fn finish(graph: StructureGraph) -> Result<StructureGraph> {
    validate::ensure_valid(&graph)?;
    Ok(graph)
}
