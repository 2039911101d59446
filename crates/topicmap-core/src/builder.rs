//! First pass: flat block stream → heading tree

use tracing::{debug, info};

use crate::error::{Result, StructureError};
use crate::hierarchy::HierarchyTree;
use crate::model::{Block, HierarchyNode, NodeId};

/// Builds a single-rooted heading tree from an ordered block stream.
///
/// Skipped outline levels (an H1 followed directly by an H3) attach to the
/// nearest enclosing heading and keep their literal level; no phantom
/// intermediate nodes are created.
#[derive(Debug, Clone, Default)]
pub struct HierarchyBuilder {
    title: Option<String>,
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Title given to the synthetic root (used for front matter).
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn build(&self, blocks: &[Block]) -> Result<HierarchyTree> {
        let mut tree = HierarchyTree::new(HierarchyNode::root(self.title.clone()));
        // Open nodes, innermost last. The root (level 0) is never popped.
        let mut open: Vec<(u32, NodeId)> = vec![(0, tree.root())];

        for (idx, block) in blocks.iter().enumerate() {
            match block {
                Block::Heading {
                    level,
                    classification_key,
                    title,
                    anchor,
                } => {
                    if *level == 0 {
                        return Err(StructureError::StructureIntegrity(format!(
                            "heading '{}' at block {} has outline level 0",
                            title, idx
                        )));
                    }
                    while open.len() > 1 && open.last().is_some_and(|(l, _)| *l >= *level) {
                        open.pop();
                    }
                    let (parent_level, parent) = *open.last().ok_or_else(|| {
                        StructureError::StructureIntegrity("heading stack lost its root".to_string())
                    })?;
                    if level - parent_level > 1 {
                        debug!(
                            "heading '{}' skips from level {} to {}; attaching without intermediates",
                            title, parent_level, level
                        );
                    }
                    let node = HierarchyNode {
                        id: NodeId::default(),
                        title: title.clone(),
                        level: *level,
                        classification_key: classification_key.clone(),
                        anchor: anchor.clone(),
                        // The root sits at 0; headings start at 1.
                        position: idx + 1,
                        content_blocks: Vec::new(),
                        role: None,
                        synthetic: false,
                    };
                    let id = tree.add_child(parent, node);
                    open.push((*level, id));
                }
                Block::Content(fragment) => {
                    let (_, current) = *open.last().ok_or_else(|| {
                        StructureError::StructureIntegrity("heading stack lost its root".to_string())
                    })?;
                    if let Some(node) = tree.node_mut(current) {
                        node.content_blocks.push(fragment.clone());
                    }
                }
            }
        }

        let root_has_content = tree
            .node(tree.root())
            .is_some_and(|root| !root.content_blocks.is_empty());
        if tree.heading_count() == 0 && root_has_content {
            return Err(StructureError::StructureIntegrity(
                "document has content but no headings".to_string(),
            ));
        }

        info!(
            "Built heading tree: {} headings from {} blocks",
            tree.heading_count(),
            blocks.len()
        );
        Ok(tree)
    }
}

/// Build with default settings.
pub fn build_hierarchy(blocks: &[Block]) -> Result<HierarchyTree> {
    HierarchyBuilder::new().build(blocks)
}
