//! One document's editing session: pristine graph, history and filter views

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::diff::{DiffEngine, GraphDiff};
use crate::edit::Edit;
use crate::error::Result;
use crate::generator::{build_structure, GeneratorOptions};
use crate::merge::{MergeEngine, MergeReport};
use crate::model::*;
use crate::undo::{UndoService, DEFAULT_HISTORY_LIMIT};

/// Settings for turning a source document into a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub generator: GeneratorOptions,
    pub history_limit: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            generator: GeneratorOptions::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// The persisted form of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub pristine: StructureGraph,
    pub history: UndoService,
}

/// Owns everything needed to edit one document reversibly.
///
/// The pristine graph is the restore point. Filters, previewed or
/// committed, are always merged from the unfiltered base of the active
/// snapshot: the pristine graph plus every non-filter edit since. A new
/// filter therefore replaces the previous one instead of stacking on it.
#[derive(Debug)]
pub struct Session {
    pristine: StructureGraph,
    history: UndoService,
    diffs: DiffEngine,
    options: GeneratorOptions,
}

impl Session {
    /// Start a session whose first snapshot is `pristine`.
    pub fn new(pristine: StructureGraph, options: ImportOptions) -> Self {
        let mut history = UndoService::with_max_levels(options.history_limit);
        history.commit(&pristine, "import");
        Session {
            pristine,
            history,
            diffs: DiffEngine::new(),
            options: options.generator,
        }
    }

    /// Run the import pipeline over `source` and start a session on it.
    pub fn import(source: &SourceDocument, options: ImportOptions) -> Result<Self> {
        let mut graph = build_structure(&source.blocks, source.title.as_deref(), options.generator)?;
        graph.assets = source.assets.clone();
        graph.metadata = source.metadata.clone();
        if let Some(title) = &source.title {
            graph.metadata.entry("title".to_string()).or_insert_with(|| title.clone());
        }
        info!(
            "Imported '{}': {} units, {} containers",
            source.title.as_deref().unwrap_or("untitled"),
            graph.unit_count(),
            graph.container_count()
        );
        Ok(Self::new(graph, options))
    }

    pub fn from_state(state: SessionState, options: GeneratorOptions) -> Self {
        let mut session = Session {
            pristine: state.pristine,
            history: state.history,
            diffs: DiffEngine::new(),
            options,
        };
        if session.history.is_empty() {
            session.history.commit(&session.pristine, "import");
        }
        session
    }

    pub fn into_state(self) -> SessionState {
        SessionState {
            pristine: self.pristine,
            history: self.history,
        }
    }

    pub fn pristine(&self) -> &StructureGraph {
        &self.pristine
    }

    /// The active committed graph.
    pub fn current(&self) -> &StructureGraph {
        self.history.current_graph().unwrap_or(&self.pristine)
    }

    /// The active graph without its committed filter.
    pub fn base(&self) -> &StructureGraph {
        self.history.current_base().unwrap_or(&self.pristine)
    }

    /// The filter behind the active graph, if one is committed.
    pub fn active_filter(&self) -> Option<&ExclusionSpec> {
        self.history.current().and_then(|snapshot| snapshot.filter())
    }

    pub fn history(&self) -> &UndoService {
        &self.history
    }

    /// Merge the unfiltered base under `spec` without committing anything.
    pub fn preview(&self, spec: &ExclusionSpec) -> Result<MergeReport> {
        MergeEngine::new(self.options).run(self.base(), spec)
    }

    /// Apply `edit` and commit the result. On error nothing is committed.
    ///
    /// A filter replaces whatever filter is active. Any other edit works on
    /// the graph as displayed, and its result becomes the new unfiltered
    /// base.
    pub fn apply(&mut self, edit: &Edit) -> Result<GraphDiff> {
        let label = edit.label();
        match edit {
            Edit::Filter { spec } => {
                let filtered = self.preview(spec)?.graph;
                Ok(self.commit_view(filtered, Some(spec), &label))
            }
            other => {
                if let Some(spec) = self.active_filter() {
                    debug!("Folding filter into base: {:?}", spec);
                }
                let next = other.apply(self.current())?;
                Ok(self.commit_view(next, None, &label))
            }
        }
    }

    pub fn commit_filter(&mut self, spec: ExclusionSpec) -> Result<GraphDiff> {
        self.apply(&Edit::Filter { spec })
    }

    /// Commit the pristine graph again, discarding the effect of all edits.
    pub fn restore_pristine(&mut self) -> GraphDiff {
        let pristine = self.pristine.clone();
        self.commit_view(pristine, None, "restore pristine")
    }

    /// Step back; `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<GraphDiff> {
        let before = self.current().clone();
        let after = self.history.undo()?.graph();
        Some(self.diffs.compute_diff(&before, after))
    }

    /// Step forward; `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<GraphDiff> {
        let before = self.current().clone();
        let after = self.history.redo()?.graph();
        Some(self.diffs.compute_diff(&before, after))
    }

    /// Commit `next` as the active graph. With `filter`, `next` is that
    /// filter's view of the current base, which is kept alongside it.
    fn commit_view(&mut self, next: StructureGraph, filter: Option<&ExclusionSpec>, label: &str) -> GraphDiff {
        let current = self.history.current_graph().unwrap_or(&self.pristine);
        let diff = self.diffs.compute_diff(current, &next);
        match filter {
            Some(spec) => {
                let base = self.history.current_base().unwrap_or(&self.pristine).clone();
                self.history.commit_filtered(&base, spec, next, label);
            }
            None => {
                self.history.commit(&next, label);
            }
        }
        info!("{}: {}", label, diff.summary());
        diff
    }
}
