//! Tree model for structured data similarity
//!
//! A [`Tree`] is an arena of [`TreeNode`]s addressed by [`NodeId`]. Every node
//! owns its content and an ordered list of child ids; the parent link is a
//! non-owning id. Two strings derived from each node are memoized:
//!
//! - **production**: `"S->NP VP"`, the node text followed by the texts of its
//!   children;
//! - **production ignoring leaves**: the same, skipping children that are
//!   leaves.
//!
//! All mutation goes through the tree (`set_content`, `add_child`,
//! `add_subtree`, `remove_subtree`), which drops the affected memoized
//! productions and the cached node orderings in one place.
//!
//! ## References
//!
//! - Collins & Duffy (2001): "Convolution Kernels for Natural Language"
//! - Moschitti (2006): "Making Tree Kernels Practical for Natural Language Learning"

mod content;
mod node;
mod ordering;

use std::fmt;

use crate::error::{KernelError, Result};

pub use content::StructureElement;
pub use node::{NodeBuilder, NodeId, TreeNode};
pub use ordering::SortKey;

use ordering::NodeOrderings;

/// A rooted, ordered tree.
#[derive(Debug, Clone)]
pub struct Tree<C = String> {
    nodes: Vec<TreeNode<C>>,
    root: NodeId,
    len: usize,
    orderings: NodeOrderings,
}

impl<C: StructureElement> Tree<C> {
    /// Build a tree from a nested description. Ids are assigned in pre-order
    /// starting at 1.
    pub fn build(root: NodeBuilder<C>) -> Self {
        let mut tree = Self {
            nodes: Vec::with_capacity(root.num_nodes()),
            root: NodeId::new(1),
            len: 0,
            orderings: NodeOrderings::default(),
        };
        tree.graft(root, None);
        tree
    }

    /// Single-node tree
    pub fn leaf(content: C) -> Self {
        Self::build(NodeBuilder {
            content,
            children: Vec::new(),
        })
    }

    /// Append `builder` below `parent` (or as the root), returning its id.
    fn graft(&mut self, builder: NodeBuilder<C>, parent: Option<NodeId>) -> NodeId {
        let first = self.next_id();
        let mut stack = vec![(builder, parent)];
        while let Some((NodeBuilder { content, children }, parent)) = stack.pop() {
            let id = self.next_id();
            self.nodes.push(TreeNode::new(id, content, parent));
            self.len += 1;
            if let Some(parent) = parent {
                self.at_mut(parent).children.push(id);
            }
            for child in children.into_iter().rev() {
                stack.push((child, Some(id)));
            }
        }
        first
    }

    fn next_id(&self) -> NodeId {
        NodeId::new(self.nodes.len() as u32 + 1)
    }

    /// Arena access for ids handed out by this tree.
    pub(crate) fn at(&self, id: NodeId) -> &TreeNode<C> {
        &self.nodes[id.index() - 1]
    }

    fn at_mut(&mut self, id: NodeId) -> &mut TreeNode<C> {
        &mut self.nodes[id.index() - 1]
    }

    fn checked(&self, id: NodeId) -> Result<NodeId> {
        match id.slot().and_then(|slot| self.nodes.get(slot)) {
            Some(node) if !node.detached => Ok(id),
            _ => Err(KernelError::UnknownNode(id)),
        }
    }

    /// Root node
    pub fn root(&self) -> NodeRef<'_, C> {
        NodeRef {
            tree: self,
            id: self.root,
        }
    }

    /// Root id
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Node by id, if it is part of the tree
    pub fn node(&self, id: NodeId) -> Option<&TreeNode<C>> {
        self.checked(id).ok().map(|id| self.at(id))
    }

    /// Navigable handle to a node, if it is part of the tree
    pub fn get(&self, id: NodeId) -> Option<NodeRef<'_, C>> {
        self.checked(id).ok().map(|id| NodeRef { tree: self, id })
    }

    /// All nodes in pre-order. Each call starts a fresh traversal.
    pub fn all_nodes(&self) -> PreOrder<'_, C> {
        self.root().all_nodes()
    }

    /// Number of nodes currently in the tree
    pub fn num_nodes(&self) -> usize {
        self.len
    }

    /// Largest id in the tree
    pub fn max_id(&self) -> NodeId {
        self.root().max_id()
    }

    /// Height of the tree, 0 for a single node
    pub fn height(&self) -> usize {
        self.root().height()
    }

    /// Leaves in pre-order
    pub fn leaves(&self) -> Vec<NodeRef<'_, C>> {
        self.root().leaves()
    }

    /// Largest number of children of any node
    pub fn max_fan_out(&self) -> usize {
        self.all_nodes()
            .map(|n| n.num_children())
            .max()
            .unwrap_or(0)
    }

    /// Memoized production of `id`: `"text->child child"`.
    pub(crate) fn production_of(&self, id: NodeId) -> &str {
        let node = self.at(id);
        node.production.get_or_init(|| self.render_production(node, true))
    }

    /// Memoized production of `id`, skipping leaf children.
    pub(crate) fn production_ignoring_leaves_of(&self, id: NodeId) -> &str {
        let node = self.at(id);
        node.production_ignoring_leaves
            .get_or_init(|| self.render_production(node, false))
    }

    fn render_production(&self, node: &TreeNode<C>, include_leaves: bool) -> String {
        let mut production = String::from(node.text());
        production.push_str("->");
        let mut first = true;
        for &child in &node.children {
            let child = self.at(child);
            if !include_leaves && child.is_leaf() {
                continue;
            }
            if !first {
                production.push(' ');
            }
            production.push_str(child.text());
            first = false;
        }
        production
    }

    /// Replace the content of a node, returning the previous content.
    ///
    /// The productions of the node and of its parent are recomputed on next
    /// access, and the node orderings are rebuilt.
    pub fn set_content(&mut self, id: NodeId, content: C) -> Result<C> {
        let id = self.checked(id)?;
        let previous = std::mem::replace(&mut self.at_mut(id).content, content);
        self.touch(id);
        Ok(previous)
    }

    /// Append a leaf below `parent`.
    pub fn add_child(&mut self, parent: NodeId, content: C) -> Result<NodeId> {
        self.add_subtree(
            parent,
            NodeBuilder {
                content,
                children: Vec::new(),
            },
        )
    }

    /// Append a whole subtree below `parent`. New ids continue after the
    /// largest id ever assigned in this tree.
    pub fn add_subtree(&mut self, parent: NodeId, subtree: NodeBuilder<C>) -> Result<NodeId> {
        let parent = self.checked(parent)?;
        let id = self.graft(subtree, Some(parent));
        self.touch(parent);
        Ok(id)
    }

    /// Detach the subtree rooted at `id`. Its ids are never reused.
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<()> {
        let id = self.checked(id)?;
        let Some(parent) = self.at(id).parent else {
            return Err(KernelError::invalid_parameter(
                "node",
                id,
                "the root of a tree cannot be removed",
            ));
        };

        let doomed: Vec<NodeId> = self.handle(id).all_nodes().map(|n| n.id()).collect();
        for &node in &doomed {
            let node = self.at_mut(node);
            node.detached = true;
            node.parent = None;
        }
        self.len -= doomed.len();
        self.at_mut(parent).children.retain(|&child| child != id);
        self.touch(parent);
        Ok(())
    }

    fn handle(&self, id: NodeId) -> NodeRef<'_, C> {
        NodeRef { tree: self, id }
    }

    /// Single invalidation path: a change at `id` alters the productions of
    /// `id` and of its parent, and every ordering of the tree.
    fn touch(&mut self, id: NodeId) {
        let parent = self.at(id).parent;
        self.at_mut(id).forget_productions();
        if let Some(parent) = parent {
            self.at_mut(parent).forget_productions();
        }
        self.invalidate();
    }

    /// Drop the cached node orderings.
    pub fn invalidate(&mut self) {
        self.orderings.reset();
    }
}

impl<C: StructureElement> fmt::Display for Tree<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root())
    }
}

/// Borrowed handle to a node that can navigate its tree.
pub struct NodeRef<'t, C> {
    tree: &'t Tree<C>,
    id: NodeId,
}

impl<C> Clone for NodeRef<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for NodeRef<'_, C> {}

impl<C> fmt::Debug for NodeRef<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef").field("id", &self.id).finish()
    }
}

impl<'t, C: StructureElement> NodeRef<'t, C> {
    fn node(&self) -> &'t TreeNode<C> {
        self.tree.at(self.id)
    }

    fn at(&self, id: NodeId) -> NodeRef<'t, C> {
        NodeRef {
            tree: self.tree,
            id,
        }
    }

    /// Node id
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Owning tree
    pub fn tree(&self) -> &'t Tree<C> {
        self.tree
    }

    /// Node content
    pub fn content(&self) -> &'t C {
        &self.node().content
    }

    /// Text of the node content
    pub fn text(&self) -> &'t str {
        self.node().text()
    }

    /// Parent node
    pub fn parent(&self) -> Option<NodeRef<'t, C>> {
        self.node().parent.map(|id| self.at(id))
    }

    /// Ordered child ids
    pub fn child_ids(&self) -> &'t [NodeId] {
        &self.node().children
    }

    /// Ordered children
    pub fn children(&self) -> impl ExactSizeIterator<Item = NodeRef<'t, C>> + 't {
        let tree = self.tree;
        self.node()
            .children
            .iter()
            .map(move |&id| NodeRef { tree, id })
    }

    /// Child at position `index`
    pub fn child(&self, index: usize) -> Option<NodeRef<'t, C>> {
        self.node().children.get(index).map(|&id| self.at(id))
    }

    /// Number of children
    pub fn num_children(&self) -> usize {
        self.node().num_children()
    }

    /// Whether the node has at least one child
    pub fn has_children(&self) -> bool {
        self.node().has_children()
    }

    /// Whether the node is a leaf
    pub fn is_leaf(&self) -> bool {
        self.node().is_leaf()
    }

    /// Memoized production, e.g. `"S->NP VP"`
    pub fn production(&self) -> &'t str {
        self.tree.production_of(self.id)
    }

    /// Memoized production without leaf children
    pub fn production_ignoring_leaves(&self) -> &'t str {
        self.tree.production_ignoring_leaves_of(self.id)
    }

    /// Nodes of this subtree in pre-order
    pub fn all_nodes(&self) -> PreOrder<'t, C> {
        PreOrder {
            tree: self.tree,
            stack: vec![self.id],
        }
    }

    /// Largest id in this subtree
    pub fn max_id(&self) -> NodeId {
        self.all_nodes()
            .map(|n| n.id)
            .max()
            .unwrap_or(self.id)
    }

    /// Length of the longest downward path, 0 for a leaf
    pub fn height(&self) -> usize {
        self.children()
            .map(|c| c.height() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Leaves of this subtree in pre-order
    pub fn leaves(&self) -> Vec<NodeRef<'t, C>> {
        self.all_nodes().filter(|n| n.is_leaf()).collect()
    }

    /// Whether at least one child is a leaf
    pub fn is_preterminal(&self) -> bool {
        self.children().any(|c| c.is_leaf())
    }

    /// Ancestor `generation` levels up; `ancestor(0)` is the node itself.
    pub fn ancestor(&self, generation: usize) -> Option<NodeRef<'t, C>> {
        let mut current = *self;
        for _ in 0..generation {
            current = current.parent()?;
        }
        Some(current)
    }

    /// Descendants exactly `generation` levels down; values below 2 give the
    /// children.
    pub fn descendants(&self, generation: usize) -> Vec<NodeRef<'t, C>> {
        if generation <= 1 {
            return self.children().collect();
        }
        self.children()
            .flat_map(|c| c.descendants(generation - 1))
            .collect()
    }

    /// Root of the tree this node belongs to
    pub fn root(&self) -> NodeRef<'t, C> {
        let mut current = *self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }
}

impl<C: StructureElement> fmt::Display for NodeRef<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.text())?;
        for child in self.children() {
            write!(f, "{}", child)?;
        }
        write!(f, ")")
    }
}

/// Pre-order traversal over a (sub)tree.
pub struct PreOrder<'t, C> {
    tree: &'t Tree<C>,
    stack: Vec<NodeId>,
}

impl<'t, C: StructureElement> Iterator for PreOrder<'t, C> {
    type Item = NodeRef<'t, C>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.at(id).children.iter().rev().copied());
        Some(NodeRef {
            tree: self.tree,
            id,
        })
    }
}
