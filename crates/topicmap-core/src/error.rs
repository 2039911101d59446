//! Error types for the structure engine

use thiserror::Error;

use crate::model::{EntryPath, RefId};
use crate::validate::Violation;

pub type Result<T> = std::result::Result<T, StructureError>;

/// Everything the engine can refuse to do.
///
/// None of these are transient: they mean malformed input or a bug, and the
/// caller keeps its last committed graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructureError {
    /// The block stream cannot form a heading tree.
    #[error("structure integrity error: {0}")]
    StructureIntegrity(String),

    #[error("could not derive a unique id from '{base}' after {attempts} attempts")]
    DuplicateId { base: String, attempts: usize },

    /// A cross-reference whose target no longer survives.
    #[error("unresolved reference to '{target}' from '{source_ref}'")]
    UnresolvedReference { source_ref: RefId, target: RefId },

    #[error("graph failed validation: {}", summarize(.0))]
    MergeValidation(Vec<Violation>),

    #[error("no entry at path {0}")]
    EntryNotFound(EntryPath),

    #[error("invalid edit: {0}")]
    InvalidEdit(String),
}

fn summarize(violations: &[Violation]) -> String {
    match violations {
        [] => "no details".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}
