//! Tree nodes and the nested builder used to construct trees.

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::content::StructureElement;

/// Identifier of a node, unique within its tree.
///
/// Ids are positive, assigned in pre-order when a tree is built and never
/// reused within that tree. Ids of two different trees may collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Wrap a raw id. Raw ids start at 1.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw numeric id
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Row/column index for dense storage
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    /// Position in the tree arena
    pub(crate) fn slot(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A node stored in a [`Tree`](super::Tree) arena.
///
/// Children are owned by the tree and referenced by id; the parent link is a
/// plain id and never owns anything.
#[derive(Debug, Clone)]
pub struct TreeNode<C> {
    pub(super) id: NodeId,
    pub(super) content: C,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
    pub(super) production: OnceLock<String>,
    pub(super) production_ignoring_leaves: OnceLock<String>,
    pub(super) detached: bool,
}

impl<C: StructureElement> TreeNode<C> {
    pub(super) fn new(id: NodeId, content: C, parent: Option<NodeId>) -> Self {
        Self {
            id,
            content,
            parent,
            children: Vec::new(),
            production: OnceLock::new(),
            production_ignoring_leaves: OnceLock::new(),
            detached: false,
        }
    }

    /// Node id
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Node content
    pub fn content(&self) -> &C {
        &self.content
    }

    /// Text of the node content
    pub fn text(&self) -> &str {
        self.content.text()
    }

    /// Parent id, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Ordered child ids
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Number of children
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Whether the node has at least one child
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Whether the node is a leaf
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Drop both memoized productions.
    pub(super) fn forget_productions(&mut self) {
        self.production.take();
        self.production_ignoring_leaves.take();
    }
}

/// Nested description of a (sub)tree, turned into an arena by
/// [`Tree::build`](super::Tree::build).
///
/// # Example
///
/// ```rust
/// use tree_kernels::{NodeBuilder, Tree};
///
/// let tree: Tree = Tree::build(NodeBuilder::with_children(
///     "S",
///     vec![NodeBuilder::new("NP"), NodeBuilder::new("VP")],
/// ));
/// assert_eq!(tree.num_nodes(), 3);
/// assert_eq!(tree.to_string(), "(S(NP)(VP))");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBuilder<C = String> {
    /// Node content
    pub content: C,
    /// Child nodes
    pub children: Vec<NodeBuilder<C>>,
}

impl<C> NodeBuilder<C> {
    /// Create a leaf
    pub fn new(content: impl Into<C>) -> Self {
        Self {
            content: content.into(),
            children: Vec::new(),
        }
    }

    /// Create a node with children
    pub fn with_children(content: impl Into<C>, children: Vec<NodeBuilder<C>>) -> Self {
        Self {
            content: content.into(),
            children,
        }
    }

    /// Append a child
    pub fn child(mut self, child: NodeBuilder<C>) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes described, including this one
    pub fn num_nodes(&self) -> usize {
        1 + self.children.iter().map(|c| c.num_nodes()).sum::<usize>()
    }
}
