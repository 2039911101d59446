//! Topicmap Core — heading hierarchy, structure generation, merge and undo

pub mod model;
pub mod error;
pub mod hierarchy;
pub mod builder;
pub mod classifier;
pub mod generator;
pub mod validate;
pub mod merge;
pub mod edit;
pub mod undo;
pub mod diff;
pub mod query;
pub mod session;
pub mod cache;


#[cfg(test)]
pub mod test_utils;

pub use model::{NodeId, RefId, Role, Fragment, Block, HierarchyNode, ContentBlock, ContentDocument, MapEntry, SourceDocument, StructureGraph, ExclusionSpec, EntryPath};
pub use error::{Result, StructureError};
pub use hierarchy::HierarchyTree;
pub use builder::{HierarchyBuilder, build_hierarchy};
pub use classifier::{classify, FRONT_MATTER_KEY};
pub use generator::{GeneratorOptions, IdAllocator, StructureGenerator, build_structure, slugify};
pub use validate::Violation;
pub use merge::{MergeEngine, MergeReport, merge};
pub use edit::Edit;
pub use undo::{Snapshot, UndoService, DEFAULT_HISTORY_LIMIT};
pub use diff::{DiffEngine, GraphDiff};
pub use query::{StructureStats, stats};
pub use session::{ImportOptions, Session, SessionState};
pub use cache::{CACHE_DIR, SESSION_CACHE, cache_dir, session_cache_path, ensure_cache_dir, save_session, load_session, load_marker, clear_cache};
