//! Depth / classification-key merging of a structure graph
//!
//! Collapsed entries fold their content into the nearest surviving ancestor,
//! which becomes (or already is) a unit. Surviving descendants of a collapsed
//! entry move up to that same ancestor, and cross-references into collapsed
//! entries are redirected to wherever their content went.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::error::{Result, StructureError};
use crate::generator::{GeneratorOptions, IdAllocator};
use crate::model::*;
use crate::validate;

/// What a merge did, alongside the merged graph.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub graph: StructureGraph,
    /// Entries removed from the map.
    pub collapsed: usize,
    /// Containers turned into units to receive collapsed content.
    pub manufactured: Vec<RefId>,
    /// Collapsed ref ids and where their content ended up.
    pub redirects: BTreeMap<RefId, Option<RefId>>,
}

/// Applies an [`ExclusionSpec`] to a graph.
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    options: GeneratorOptions,
}

impl MergeEngine {
    pub fn new(options: GeneratorOptions) -> Self {
        MergeEngine { options }
    }

    /// Merge `source` under `spec`. `source` is never modified; callers pass
    /// the unfiltered graph so repeated filters never compound.
    pub fn run(&self, source: &StructureGraph, spec: &ExclusionSpec) -> Result<MergeReport> {
        let mut state = MergeState {
            source,
            spec,
            drafts: Vec::new(),
            top: Vec::new(),
            documents: BTreeMap::new(),
            redirects: HashMap::new(),
            pending: Vec::new(),
            alloc: IdAllocator::reserving(source, self.options),
            manufactured: Vec::new(),
            collapsed: 0,
        };

        for entry in &source.entries {
            state.visit(entry, 1, None, Parent::Top, false)?;
        }

        let entries: Vec<MapEntry> = state.top.iter().map(|&idx| state.materialize(idx)).collect();
        let mut documents = state.documents;
        rewrite_references(&mut documents, &state.redirects)?;

        let graph = StructureGraph {
            entries,
            documents,
            assets: source.assets.clone(),
            metadata: source.metadata.clone(),
        };
        validate::ensure_valid(&graph)?;

        info!(
            "Merged structure: {} collapsed, {} manufactured, {} units remain",
            state.collapsed,
            state.manufactured.len(),
            graph.unit_count()
        );
        Ok(MergeReport {
            graph,
            collapsed: state.collapsed,
            manufactured: state.manufactured,
            redirects: state.redirects.into_iter().collect(),
        })
    }
}

/// Merge with default id options, returning only the graph.
pub fn merge(source: &StructureGraph, spec: &ExclusionSpec) -> Result<StructureGraph> {
    MergeEngine::default().run(source, spec).map(|report| report.graph)
}

/// An output entry under construction.
struct Draft {
    ref_id: Option<RefId>,
    title: String,
    classification_key: String,
    level: u32,
    synthetic: bool,
    children: Vec<usize>,
    /// The draft's own intro, when it survives.
    intro: Option<usize>,
}

/// What became of an entry's parent in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parent {
    Top,
    /// Kept as the draft at this index.
    Kept(usize),
    /// Collapsed; `marked` when its title is waiting in `pending`.
    Collapsed { marked: bool },
}

struct MergeState<'a> {
    source: &'a StructureGraph,
    spec: &'a ExclusionSpec,
    drafts: Vec<Draft>,
    top: Vec<usize>,
    documents: BTreeMap<RefId, ContentDocument>,
    redirects: HashMap<RefId, Option<RefId>>,
    /// Titles of collapsed containers not yet written anywhere.
    pending: Vec<ContentBlock>,
    alloc: IdAllocator,
    manufactured: Vec<RefId>,
    collapsed: usize,
}

impl MergeState<'_> {
    /// `host` is the nearest surviving ancestor in the output, if any.
    /// `first` is set for the first child of its source parent; a synthetic
    /// first child is that parent's intro.
    fn visit(
        &mut self,
        entry: &MapEntry,
        depth: usize,
        host: Option<usize>,
        parent: Parent,
        first: bool,
    ) -> Result<()> {
        let intro = first && entry.synthetic;
        if self.spec.collapses(entry, depth) {
            self.collapsed += 1;
            let mark = self.pending.len();
            match &entry.ref_id {
                Some(ref_id) => self.absorb(entry, ref_id, host, parent, intro)?,
                None => self.pending.push(merged_title(entry)),
            }
            let collapsed = Parent::Collapsed {
                marked: entry.ref_id.is_none(),
            };
            for (i, child) in entry.children.iter().enumerate() {
                self.visit(child, depth + 1, host, collapsed, i == 0)?;
            }
            self.pending.truncate(mark);
            return Ok(());
        }

        let idx = self.drafts.len();
        self.drafts.push(Draft {
            ref_id: entry.ref_id.clone(),
            title: entry.title.clone(),
            classification_key: entry.classification_key.clone(),
            level: entry.level,
            synthetic: entry.synthetic,
            children: Vec::new(),
            intro: None,
        });
        match host {
            Some(host) => self.drafts[host].children.push(idx),
            None => self.top.push(idx),
        }
        if let (true, Parent::Kept(owner)) = (intro, parent) {
            self.drafts[owner].intro = Some(idx);
        }
        if let Some(ref_id) = &entry.ref_id {
            let doc = self.source_doc(ref_id)?.clone();
            self.documents.insert(ref_id.clone(), doc);
        }

        // Markers of collapsed ancestors never land inside a surviving subtree.
        let saved = std::mem::take(&mut self.pending);
        for (i, child) in entry.children.iter().enumerate() {
            self.visit(child, depth + 1, Some(idx), Parent::Kept(idx), i == 0)?;
        }
        self.pending = saved;
        Ok(())
    }

    /// Fold a collapsed unit's content into its host.
    fn absorb(
        &mut self,
        entry: &MapEntry,
        ref_id: &RefId,
        host: Option<usize>,
        parent: Parent,
        intro: bool,
    ) -> Result<()> {
        let Some(host) = host else {
            warn!("'{}' collapses with no surviving ancestor; its content is dropped", entry.title);
            self.pending.clear();
            self.redirects.insert(ref_id.clone(), None);
            return Ok(());
        };

        let source_doc = self.source_doc(ref_id)?.clone();
        let is_own_intro = intro && parent == Parent::Kept(host);

        // A container taking back its own intro simply becomes that unit.
        if is_own_intro && self.drafts[host].ref_id.is_none() {
            debug!("Container '{}' adopts its intro '{}'", entry.title, ref_id);
            self.drafts[host].ref_id = Some(ref_id.clone());
            self.documents.insert(ref_id.clone(), source_doc);
            self.manufactured.push(ref_id.clone());
            return Ok(());
        }

        let target = self.ensure_unit(host)?;
        // The intro of a collapsed container sits right after that
        // container's marker; one marker is enough.
        let parent_marked = intro && parent == Parent::Collapsed { marked: true };
        let pending = std::mem::take(&mut self.pending);

        let doc = self
            .documents
            .get_mut(&target)
            .ok_or_else(|| StructureError::MergeValidation(vec![validate::Violation::MissingDocument(target.clone())]))?;
        doc.blocks.extend(pending);
        if !(is_own_intro || parent_marked) {
            doc.blocks.push(merged_title(entry));
        }
        doc.blocks.extend(source_doc.blocks);

        debug!("Collapsed '{}' into '{}'", ref_id, target);
        self.redirects.insert(ref_id.clone(), Some(target));
        Ok(())
    }

    /// The unit that receives content collapsed into the draft at `idx`:
    /// the draft itself, its surviving intro, or a unit manufactured from
    /// the container.
    fn ensure_unit(&mut self, idx: usize) -> Result<RefId> {
        let draft = &self.drafts[idx];
        if let Some(ref_id) = &draft.ref_id {
            return Ok(ref_id.clone());
        }
        if let Some(ref_id) = draft.intro.and_then(|intro| self.drafts[intro].ref_id.clone()) {
            return Ok(ref_id);
        }
        let title = draft.title.clone();
        let ref_id = self.alloc.allocate(&title)?;
        debug!("Manufacturing unit '{}' from container '{}'", ref_id, title);
        self.documents
            .insert(ref_id.clone(), ContentDocument::new(ref_id.clone(), title));
        self.drafts[idx].ref_id = Some(ref_id.clone());
        self.manufactured.push(ref_id.clone());
        Ok(ref_id)
    }

    fn source_doc(&self, ref_id: &RefId) -> Result<&ContentDocument> {
        self.source.documents.get(ref_id).ok_or_else(|| {
            StructureError::MergeValidation(vec![validate::Violation::MissingDocument(ref_id.clone())])
        })
    }

    fn materialize(&self, idx: usize) -> MapEntry {
        let draft = &self.drafts[idx];
        MapEntry {
            ref_id: draft.ref_id.clone(),
            title: draft.title.clone(),
            classification_key: draft.classification_key.clone(),
            level: draft.level,
            synthetic: draft.synthetic,
            children: draft.children.iter().map(|&child| self.materialize(child)).collect(),
        }
    }
}

fn merged_title(entry: &MapEntry) -> ContentBlock {
    ContentBlock::MergedTitle {
        title: entry.title.clone(),
        level: entry.level,
    }
}

/// Point cross-references at the surviving ref ids in `redirects`.
///
/// A reference to an entry whose content was dropped cannot be repaired and
/// fails with [`StructureError::UnresolvedReference`].
pub(crate) fn rewrite_references(
    documents: &mut BTreeMap<RefId, ContentDocument>,
    redirects: &HashMap<RefId, Option<RefId>>,
) -> Result<()> {
    if redirects.is_empty() {
        return Ok(());
    }
    for (key, doc) in documents.iter_mut() {
        for target in doc.cross_refs() {
            if let Some(None) = redirects.get(target) {
                return Err(StructureError::UnresolvedReference {
                    source_ref: key.clone(),
                    target: target.clone(),
                });
            }
        }
        doc.rewrite_refs(|target| redirects.get(target).cloned().flatten());
    }
    Ok(())
}
