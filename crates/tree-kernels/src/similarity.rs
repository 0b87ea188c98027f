//! Node similarity functions for the Smoothed Partial Tree Kernel.
//!
//! The smoothed kernel replaces exact node matching with a similarity score in
//! `[0, 1]`. Real deployments plug in lexical or embedding-based scores; this
//! module provides the trait and two content-only implementations.

use std::collections::HashSet;

use crate::tree::StructureElement;

/// Similarity between the contents of two nodes, in `[0, 1]`.
pub trait NodeSimilarity<C>: Send + Sync {
    /// Similarity score
    fn similarity(&self, a: &C, b: &C) -> f64;
}

impl<C, F> NodeSimilarity<C> for F
where
    F: Fn(&C, &C) -> f64 + Send + Sync,
{
    fn similarity(&self, a: &C, b: &C) -> f64 {
        self(a, b)
    }
}

/// 1 for equal texts, 0 otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatchSimilarity;

impl<C: StructureElement> NodeSimilarity<C> for ExactMatchSimilarity {
    fn similarity(&self, a: &C, b: &C) -> f64 {
        if a.text() == b.text() {
            1.0
        } else {
            0.0
        }
    }
}

/// Jaccard similarity between the character sets of two texts.
///
/// Equal texts score 1; two empty texts score 1 as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharJaccardSimilarity;

impl<C: StructureElement> NodeSimilarity<C> for CharJaccardSimilarity {
    fn similarity(&self, a: &C, b: &C) -> f64 {
        let (a, b) = (a.text(), b.text());
        if a == b {
            return 1.0;
        }
        let chars_a: HashSet<char> = a.chars().collect();
        let chars_b: HashSet<char> = b.chars().collect();
        let intersection = chars_a.intersection(&chars_b).count();
        let union = chars_a.union(&chars_b).count();
        if union > 0 {
            intersection as f64 / union as f64
        } else {
            0.0
        }
    }
}
