//! Classified heading tree → map entries and content documents

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::builder::HierarchyBuilder;
use crate::classifier::classify;
use crate::error::{Result, StructureError};
use crate::hierarchy::HierarchyTree;
use crate::model::*;
use crate::validate;

static NON_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Fallback slug for titles with no usable characters.
pub const EMPTY_SLUG: &str = "topic";

/// Knobs for identifier generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Upper bound on numeric suffixes tried per title.
    pub max_id_attempts: usize,
    pub slug_max_len: usize,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            max_id_attempts: 1000,
            slug_max_len: 64,
        }
    }
}

/// Lowercase ASCII slug: runs of anything else become a single dash.
pub fn slugify(title: &str, max_len: usize) -> String {
    let lowered = title.to_lowercase();
    let slug = NON_SLUG.replace_all(&lowered, "-");
    let mut slug: String = slug.trim_matches('-').chars().take(max_len).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

/// Hands out ref ids that are unique within one graph.
///
/// Collisions get `-2`, `-3`, … in allocation order, so a fixed input order
/// always yields the same ids.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    used: HashSet<String>,
    options: GeneratorOptions,
}

impl IdAllocator {
    pub fn new(options: GeneratorOptions) -> Self {
        IdAllocator {
            used: HashSet::new(),
            options,
        }
    }

    /// An allocator that will never hand out any id already in `graph`.
    pub fn reserving(graph: &StructureGraph, options: GeneratorOptions) -> Self {
        let mut alloc = Self::new(options);
        alloc.used.extend(graph.documents.keys().map(|r| r.0.clone()));
        alloc
    }

    pub fn allocate(&mut self, title: &str) -> Result<RefId> {
        let base = slugify(title, self.options.slug_max_len);
        if self.used.insert(base.clone()) {
            return Ok(RefId(base));
        }
        for n in 2..self.options.max_id_attempts.saturating_add(2) {
            let candidate = format!("{}-{}", base, n);
            if self.used.insert(candidate.clone()) {
                debug!("ref id '{}' taken, using '{}'", base, candidate);
                return Ok(RefId(candidate));
            }
        }
        Err(StructureError::DuplicateId {
            base,
            attempts: self.options.max_id_attempts,
        })
    }
}

/// Emits the structure graph for a classified tree.
#[derive(Debug, Clone, Default)]
pub struct StructureGenerator {
    options: GeneratorOptions,
}

impl StructureGenerator {
    pub fn new(options: GeneratorOptions) -> Self {
        StructureGenerator { options }
    }

    pub fn generate(&self, tree: &HierarchyTree) -> Result<StructureGraph> {
        let ids = self.assign_ids(tree)?;
        let anchors = collect_anchors(tree, &ids);

        let mut graph = StructureGraph::new();
        for child in tree.children(tree.root()) {
            let entry = emit(tree, child, &ids, &anchors, &mut graph)?;
            graph.entries.push(entry);
        }

        validate::ensure_valid(&graph)?;
        info!(
            "Generated structure: {} units, {} containers",
            graph.unit_count(),
            graph.container_count()
        );
        Ok(graph)
    }

    /// Ref ids for every unit, allocated in document (pre-)order.
    fn assign_ids(&self, tree: &HierarchyTree) -> Result<HashMap<NodeId, RefId>> {
        let mut alloc = IdAllocator::new(self.options);
        let mut ids = HashMap::new();
        let mut stack = vec![tree.root()];
        while let Some(id) = stack.pop() {
            if let Some(node) = tree.node(id) {
                if node.role == Some(Role::Unit) {
                    ids.insert(id, alloc.allocate(&node.title)?);
                }
            }
            stack.extend(tree.children(id).into_iter().rev());
        }
        Ok(ids)
    }
}

/// Map source anchors to ref ids. An anchor on a container lands on the
/// first unit of its subtree.
fn collect_anchors(tree: &HierarchyTree, ids: &HashMap<NodeId, RefId>) -> HashMap<String, RefId> {
    let mut anchors = HashMap::new();
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        let children = tree.children(id);
        if let Some(anchor) = tree.node(id).and_then(|n| n.anchor.clone()) {
            match first_unit(tree, id, ids) {
                Some(target) => {
                    if anchors.contains_key(&anchor) {
                        warn!("anchor '{}' defined twice; keeping the first", anchor);
                    } else {
                        anchors.insert(anchor, target);
                    }
                }
                None => debug!("anchor '{}' has no unit beneath it", anchor),
            }
        }
        stack.extend(children.into_iter().rev());
    }
    anchors
}

fn first_unit(tree: &HierarchyTree, id: NodeId, ids: &HashMap<NodeId, RefId>) -> Option<RefId> {
    if let Some(ref_id) = ids.get(&id) {
        return Some(ref_id.clone());
    }
    tree.children(id)
        .into_iter()
        .find_map(|child| first_unit(tree, child, ids))
}

fn emit(
    tree: &HierarchyTree,
    id: NodeId,
    ids: &HashMap<NodeId, RefId>,
    anchors: &HashMap<String, RefId>,
    graph: &mut StructureGraph,
) -> Result<MapEntry> {
    let mut children = Vec::new();
    for child in tree.children(id) {
        children.push(emit(tree, child, ids, anchors, graph)?);
    }

    let node = tree
        .node(id)
        .ok_or_else(|| StructureError::StructureIntegrity(format!("node {:?} vanished", id)))?;
    let ref_id = ids.get(&id).cloned();

    if let Some(ref_id) = &ref_id {
        let mut doc = ContentDocument::new(ref_id.clone(), node.title.clone());
        for fragment in &node.content_blocks {
            doc.blocks.push(render_fragment(fragment, anchors)?);
        }
        graph.documents.insert(ref_id.clone(), doc);
    }

    Ok(MapEntry {
        ref_id,
        title: node.title.clone(),
        classification_key: node.classification_key.clone(),
        level: node.level,
        synthetic: node.synthetic,
        children,
    })
}

fn render_fragment(fragment: &Fragment, anchors: &HashMap<String, RefId>) -> Result<ContentBlock> {
    Ok(match fragment {
        Fragment::Paragraph { text } => ContentBlock::Paragraph { text: text.clone() },
        Fragment::Table { rows } => ContentBlock::Table { rows: rows.clone() },
        Fragment::Image { asset, alt } => ContentBlock::Image {
            asset: asset.clone(),
            alt: alt.clone(),
        },
        Fragment::CrossRef { anchor, text } => {
            let target = anchors.get(anchor).cloned().ok_or_else(|| {
                StructureError::StructureIntegrity(format!("cross-reference to unknown anchor '{}'", anchor))
            })?;
            ContentBlock::CrossRef {
                target,
                text: text.clone(),
            }
        }
    })
}

/// Run the whole import pipeline: build, classify, generate.
pub fn build_structure(
    blocks: &[Block],
    title: Option<&str>,
    options: GeneratorOptions,
) -> Result<StructureGraph> {
    let mut builder = HierarchyBuilder::new();
    if let Some(title) = title {
        builder = builder.with_title(title);
    }
    let tree = classify(builder.build(blocks)?);
    StructureGenerator::new(options).generate(&tree)
}
