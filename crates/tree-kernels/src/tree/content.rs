//! Node content.
//!
//! The kernels only ever look at a node's content through its textual form:
//! labels are compared by text, productions are built from text, and two
//! contents are "equal" exactly when their texts are equal.

use std::fmt::Debug;
use std::sync::Arc;

/// Content stored in a tree node.
///
/// Implementations must return the same text for the lifetime of the value;
/// the tree memoizes productions built from it.
pub trait StructureElement: Debug + Send + Sync {
    /// Stable textual representation used for ordering and matching.
    fn text(&self) -> &str;

    /// Text equality, the only notion of content equality the kernels use.
    fn same_text(&self, other: &Self) -> bool
    where
        Self: Sized,
    {
        self.text() == other.text()
    }
}

impl StructureElement for String {
    fn text(&self) -> &str {
        self.as_str()
    }
}

impl StructureElement for &'static str {
    fn text(&self) -> &str {
        self
    }
}

impl StructureElement for Box<str> {
    fn text(&self) -> &str {
        self
    }
}

impl StructureElement for Arc<str> {
    fn text(&self) -> &str {
        self
    }
}
