//! Cached node orderings.
//!
//! The pairing step of every tree kernel merge-joins two sorted node lists.
//! Each tree keeps its sorted lists around until its shape or content
//! changes.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::{NodeId, StructureElement, Tree};

/// Key used to sort and pair nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    /// Node text
    Label,
    /// Full production
    Production,
    /// Full production, internal nodes only
    ProductionIgnoringLeaves,
}

#[derive(Debug, Clone, Default)]
pub(super) struct NodeOrderings {
    by_label: OnceLock<Vec<NodeId>>,
    by_production: OnceLock<Vec<NodeId>>,
    by_production_internal: OnceLock<Vec<NodeId>>,
}

impl NodeOrderings {
    pub(super) fn reset(&mut self) {
        self.by_label.take();
        self.by_production.take();
        self.by_production_internal.take();
    }
}

impl<C: StructureElement> Tree<C> {
    /// Nodes sorted by text; equal texts keep pre-order.
    pub fn ordered_by_label(&self) -> &[NodeId] {
        self.orderings
            .by_label
            .get_or_init(|| self.sorted(|_| true, |id| self.at(id).text()))
    }

    /// Nodes sorted by production; equal productions keep pre-order.
    pub fn ordered_by_production(&self) -> &[NodeId] {
        self.orderings
            .by_production
            .get_or_init(|| self.sorted(|_| true, |id| self.production_of(id)))
    }

    /// Internal nodes sorted by production; leaves are left out.
    pub fn ordered_by_production_ignoring_leaves(&self) -> &[NodeId] {
        self.orderings.by_production_internal.get_or_init(|| {
            self.sorted(
                |id| self.at(id).has_children(),
                |id| self.production_of(id),
            )
        })
    }

    /// Ordering for `key`
    pub fn ordered_by(&self, key: SortKey) -> &[NodeId] {
        match key {
            SortKey::Label => self.ordered_by_label(),
            SortKey::Production => self.ordered_by_production(),
            SortKey::ProductionIgnoringLeaves => self.ordered_by_production_ignoring_leaves(),
        }
    }

    /// The text a node is compared by under `key`
    pub fn sort_text(&self, id: NodeId, key: SortKey) -> &str {
        match key {
            SortKey::Label => self.at(id).text(),
            SortKey::Production | SortKey::ProductionIgnoringLeaves => self.production_of(id),
        }
    }

    fn sorted<'a>(
        &'a self,
        keep: impl Fn(NodeId) -> bool,
        text: impl Fn(NodeId) -> &'a str,
    ) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .all_nodes()
            .map(|n| n.id())
            .filter(|&id| keep(id))
            .collect();
        // stable: equal keys stay in pre-order
        ids.sort_by(|&a, &b| text(a).cmp(text(b)));
        ids
    }
}
