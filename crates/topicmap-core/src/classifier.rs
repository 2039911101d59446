//! Second pass: assign Container / Unit roles

use tracing::debug;

use crate::hierarchy::HierarchyTree;
use crate::model::{HierarchyNode, NodeId, Role};

/// Classification key given to front matter that precedes the first heading.
pub const FRONT_MATTER_KEY: &str = "FrontMatter";

/// Title used for front matter when the document has no title.
pub const FRONT_MATTER_TITLE: &str = "Front Matter";

/// Assign a role to every node of `tree`.
///
/// A node with children becomes a Container and hands any leading content to
/// a synthetic first-child Unit, so nothing written before the first
/// sub-heading is dropped. A childless node is a Unit. The root is always a
/// Container and is never rendered.
pub fn classify(mut tree: HierarchyTree) -> HierarchyTree {
    let root = tree.root();
    for id in tree.post_order() {
        if tree.has_children(id) || id == root {
            hoist_leading_content(&mut tree, id);
            if let Some(node) = tree.node_mut(id) {
                node.role = Some(Role::Container);
            }
        } else if let Some(node) = tree.node_mut(id) {
            node.role = Some(Role::Unit);
        }
    }
    tree
}

/// Move a container's own content into a new first child Unit.
fn hoist_leading_content(tree: &mut HierarchyTree, id: NodeId) {
    let is_root = id == tree.root();
    let Some(node) = tree.node_mut(id) else {
        return;
    };
    if node.content_blocks.is_empty() {
        return;
    }
    let content = std::mem::take(&mut node.content_blocks);

    let intro = if is_root {
        let title = if node.title.is_empty() {
            FRONT_MATTER_TITLE.to_string()
        } else {
            node.title.clone()
        };
        HierarchyNode {
            id: NodeId::default(),
            title,
            level: 1,
            classification_key: FRONT_MATTER_KEY.to_string(),
            anchor: None,
            position: node.position,
            content_blocks: content,
            role: Some(Role::Unit),
            synthetic: true,
        }
    } else {
        HierarchyNode {
            id: NodeId::default(),
            title: node.title.clone(),
            level: node.level + 1,
            classification_key: node.classification_key.clone(),
            anchor: None,
            position: node.position,
            content_blocks: content,
            role: Some(Role::Unit),
            synthetic: true,
        }
    };
    debug!("Hoisting {} leading block(s) of '{}' into an intro unit", intro.content_blocks.len(), intro.title);
    tree.add_child(id, intro);
}
