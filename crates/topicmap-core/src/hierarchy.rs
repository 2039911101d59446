//! Heading tree wrapper using petgraph::StableDiGraph with custom NodeId

use crate::model::*;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;

/// The heading tree — a rooted tree stored as parent → child edges.
///
/// Children are kept in document order by sorting on
/// [`HierarchyNode::position`]; petgraph's own neighbour order is not relied on.
#[derive(Clone)]
pub struct HierarchyTree {
    inner: StableDiGraph<HierarchyNode, ()>,
    root: NodeId,
}

impl std::fmt::Debug for HierarchyTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HierarchyTree")
            .field("node_count", &self.inner.node_count())
            .field("root", &self.root)
            .finish()
    }
}

impl HierarchyTree {
    /// Create a tree holding only the synthetic root.
    pub fn new(root: HierarchyNode) -> Self {
        let mut inner = StableDiGraph::new();
        let idx = inner.add_node(root);
        let root = NodeId(idx.index() as u64);
        if let Some(node) = inner.node_weight_mut(idx) {
            node.id = root;
        }
        HierarchyTree { inner, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Attach `node` under `parent`. Returns the assigned NodeId.
    pub fn add_child(&mut self, parent: NodeId, node: HierarchyNode) -> NodeId {
        let idx = self.inner.add_node(node);
        let id = NodeId(idx.index() as u64);
        if let Some(weight) = self.inner.node_weight_mut(idx) {
            weight.id = id;
        }
        self.inner.add_edge(index(parent), idx, ());
        id
    }

    /// Get a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&HierarchyNode> {
        self.inner.node_weight(index(id))
    }

    /// Get a mutable node by ID.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut HierarchyNode> {
        self.inner.node_weight_mut(index(id))
    }

    /// Total number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Children of a node in document order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children: Vec<(usize, bool, NodeId)> = self
            .inner
            .neighbors_directed(index(id), Direction::Outgoing)
            .filter_map(|idx| {
                self.inner
                    .node_weight(idx)
                    .map(|n| (n.position, !n.synthetic, NodeId(idx.index() as u64)))
            })
            .collect();
        // A synthetic intro shares its parent's position and must come first.
        children.sort();
        children.into_iter().map(|(_, _, id)| id).collect()
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.inner
            .neighbors_directed(index(id), Direction::Outgoing)
            .next()
            .is_some()
    }

    /// The parent of a node; `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.inner
            .neighbors_directed(index(id), Direction::Incoming)
            .next()
            .map(|idx| NodeId(idx.index() as u64))
    }

    /// Nodes from `id` up to (excluding) the root, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            if node == self.root {
                break;
            }
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    /// All node ids in post-order (children before parents, document order).
    pub fn post_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.node_count());
        let mut stack = vec![(self.root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                out.push(id);
                continue;
            }
            stack.push((id, true));
            for child in self.children(id).into_iter().rev() {
                stack.push((child, false));
            }
        }
        out
    }

    /// Number of heading nodes below the root.
    pub fn heading_count(&self) -> usize {
        self.node_count().saturating_sub(1)
    }
}

fn index(id: NodeId) -> NodeIndex {
    NodeIndex::new(id.0 as usize)
}
