//! Candidate node pairs.
//!
//! Only pairs of nodes whose sort keys match can contribute to the exact-match
//! kernels, so instead of comparing every node of one tree against every node
//! of the other the kernels merge-join two sorted node lists
//! (Moschitti, EACL 2006). Runs of equal keys produce their full cross
//! product. The cost is `O(n log n + m log m + k)` for `k` matching pairs.
//!
//! The smoothed kernel cannot prune on exact keys; [`similar_node_pairs`]
//! scores every pair once and keeps those above the similarity threshold.

use std::cmp::Ordering;

use log::trace;
use rayon::prelude::*;

use crate::delta::{DeltaCache, NOT_COMPUTED};
use crate::error::Result;
use crate::similarity::NodeSimilarity;
use crate::tree::{NodeId, SortKey, StructureElement, Tree};

/// Below this many node pairs the similarity pre-pass stays on one thread.
const PARALLEL_PREPASS_PAIRS: usize = 4096;

/// A node of the first tree paired with a node of the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodePair {
    /// Node of the first tree
    pub a: NodeId,
    /// Node of the second tree
    pub b: NodeId,
}

/// Pairs of nodes with equal `key`, each seeded as [`NOT_COMPUTED`] in
/// `cache`.
///
/// Within a run of equal keys, pairs come out with the first tree's nodes in
/// the outer loop and the second tree's in the inner loop, both in pre-order.
pub fn find_common_nodes<C: StructureElement>(
    a: &Tree<C>,
    b: &Tree<C>,
    key: SortKey,
    cache: &mut dyn DeltaCache,
) -> Result<Vec<NodePair>> {
    let (nodes_a, nodes_b) = (a.ordered_by(key), b.ordered_by(key));
    let mut pairs = Vec::new();
    let (mut i, mut j) = (0, 0);

    while i < nodes_a.len() && j < nodes_b.len() {
        match a.sort_text(nodes_a[i], key).cmp(b.sort_text(nodes_b[j], key)) {
            Ordering::Greater => j += 1,
            Ordering::Less => i += 1,
            Ordering::Equal => {
                let i_end = run_end(a, nodes_a, i, key);
                let j_end = run_end(b, nodes_b, j, key);
                for &x in &nodes_a[i..i_end] {
                    for &y in &nodes_b[j..j_end] {
                        cache.add(x, y, NOT_COMPUTED)?;
                        pairs.push(NodePair { a: x, b: y });
                    }
                }
                i = i_end;
                j = j_end;
            }
        }
    }

    trace!("{:?} pairing produced {} candidate pairs", key, pairs.len());
    Ok(pairs)
}

/// End (exclusive) of the run of nodes sharing the key at `start`.
fn run_end<C: StructureElement>(tree: &Tree<C>, ids: &[NodeId], start: usize, key: SortKey) -> usize {
    let text = tree.sort_text(ids[start], key);
    start
        + ids[start..]
            .iter()
            .take_while(|&&id| tree.sort_text(id, key) == text)
            .count()
}

/// Node-pair similarities computed once per evaluation.
#[derive(Debug, Clone, Default)]
pub struct SimilarityTable {
    cols: usize,
    values: Vec<f64>,
}

impl SimilarityTable {
    /// Similarity of `(a, b)`; 0 for pairs that were not scored.
    pub fn get(&self, a: NodeId, b: NodeId) -> f64 {
        let (i, j) = (a.index(), b.index());
        if j >= self.cols {
            return 0.0;
        }
        self.values.get(i * self.cols + j).copied().unwrap_or(0.0)
    }
}

/// Score every node pair, seed the pairs at or above `threshold` as
/// [`NOT_COMPUTED`] and cache the others as exactly `0.0`.
///
/// Large trees are scored in parallel, one row of the first tree per task.
pub fn similar_node_pairs<C, S>(
    a: &Tree<C>,
    b: &Tree<C>,
    similarity: &S,
    threshold: f64,
    cache: &mut dyn DeltaCache,
) -> Result<(Vec<NodePair>, SimilarityTable)>
where
    C: StructureElement,
    S: NodeSimilarity<C> + ?Sized,
{
    let (nodes_a, nodes_b) = (a.ordered_by_label(), b.ordered_by_label());
    let score_row = |&x: &NodeId| -> Vec<f64> {
        let content = a.at(x).content();
        nodes_b
            .iter()
            .map(|&y| similarity.similarity(content, b.at(y).content()))
            .collect()
    };
    let rows: Vec<Vec<f64>> = if nodes_a.len() * nodes_b.len() >= PARALLEL_PREPASS_PAIRS {
        nodes_a.par_iter().map(score_row).collect()
    } else {
        nodes_a.iter().map(score_row).collect()
    };

    let cols = b.max_id().index() + 1;
    let mut table = SimilarityTable {
        cols,
        values: vec![0.0; (a.max_id().index() + 1) * cols],
    };
    let mut pairs = Vec::new();
    for (&x, row) in nodes_a.iter().zip(&rows) {
        for (&y, &sim) in nodes_b.iter().zip(row) {
            table.values[x.index() * cols + y.index()] = sim;
            if sim >= threshold {
                cache.add(x, y, NOT_COMPUTED)?;
                pairs.push(NodePair { a: x, b: y });
            } else {
                cache.add(x, y, 0.0)?;
            }
        }
    }

    trace!(
        "similarity pre-pass kept {} of {} pairs",
        pairs.len(),
        nodes_a.len() * nodes_b.len()
    );
    Ok((pairs, table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{DenseDeltaCache, SparseDeltaCache};
    use crate::similarity::{CharJaccardSimilarity, ExactMatchSimilarity, NodeSimilarity};
    use crate::tree::NodeBuilder;

    fn np_vp() -> Tree {
        Tree::build(NodeBuilder::with_children(
            "S",
            vec![NodeBuilder::new("NP"), NodeBuilder::new("VP")],
        ))
    }

    fn np_np() -> Tree {
        Tree::build(NodeBuilder::with_children(
            "S",
            vec![NodeBuilder::new("NP"), NodeBuilder::new("NP")],
        ))
    }

    fn brute_force(a: &Tree, b: &Tree, key: SortKey) -> Vec<NodePair> {
        let mut pairs = Vec::new();
        for &x in a.ordered_by(key) {
            for &y in b.ordered_by(key) {
                if a.sort_text(x, key) == b.sort_text(y, key) {
                    pairs.push(NodePair { a: x, b: y });
                }
            }
        }
        pairs
    }

    #[test]
    fn test_label_pairs_cross_product() {
        let (a, b) = (np_vp(), np_np());
        let mut cache = DenseDeltaCache::new();
        let pairs = find_common_nodes(&a, &b, SortKey::Label, &mut cache).unwrap();
        // NP(2) x {NP(2), NP(3)} and S x S
        assert_eq!(
            pairs,
            vec![
                NodePair {
                    a: NodeId::new(2),
                    b: NodeId::new(2)
                },
                NodePair {
                    a: NodeId::new(2),
                    b: NodeId::new(3)
                },
                NodePair {
                    a: NodeId::new(1),
                    b: NodeId::new(1)
                },
            ]
        );
        for pair in &pairs {
            assert_eq!(cache.get(pair.a, pair.b), NOT_COMPUTED);
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_matches_brute_force() {
        let (a, b) = (np_np(), np_np());
        for key in [
            SortKey::Label,
            SortKey::Production,
            SortKey::ProductionIgnoringLeaves,
        ] {
            let mut cache = SparseDeltaCache::new();
            let pairs = find_common_nodes(&a, &b, key, &mut cache).unwrap();
            assert_eq!(pairs, brute_force(&a, &b, key), "{:?}", key);
        }
    }

    #[test]
    fn test_production_pairs_skip_differing_roots() {
        let (a, b) = (np_vp(), np_np());
        let mut cache = DenseDeltaCache::new();
        let pairs = find_common_nodes(&a, &b, SortKey::Production, &mut cache).unwrap();
        // "S->NP VP" != "S->NP NP"; only the NP leaves match
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.a == NodeId::new(2)));

        let internal =
            find_common_nodes(&a, &b, SortKey::ProductionIgnoringLeaves, &mut cache).unwrap();
        assert!(internal.is_empty());
    }

    #[test]
    fn test_disjoint_vocabulary() {
        let a: Tree = Tree::build(NodeBuilder::with_children("A", vec![NodeBuilder::new("B")]));
        let b: Tree = Tree::build(NodeBuilder::with_children("C", vec![NodeBuilder::new("D")]));
        let mut cache = DenseDeltaCache::new();
        assert!(find_common_nodes(&a, &b, SortKey::Label, &mut cache)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_similarity_prepass() {
        let (a, b) = (np_vp(), np_np());
        let mut cache = DenseDeltaCache::new();
        let (pairs, table) =
            similar_node_pairs(&a, &b, &ExactMatchSimilarity, 0.5, &mut cache).unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(table.get(NodeId::new(2), NodeId::new(3)), 1.0);
        assert_eq!(table.get(NodeId::new(3), NodeId::new(3)), 0.0);
        // pruned pairs are computed-and-zero, candidates are pending
        assert_eq!(cache.lookup(NodeId::new(3), NodeId::new(2)), Some(0.0));
        assert_eq!(cache.lookup(NodeId::new(1), NodeId::new(1)), None);
        assert_eq!(cache.len(), 9);
    }

    fn wide(seed: usize) -> Tree {
        let tags = ["NP", "VP", "PP"];
        let words = ["dog", "dogs", "cat", "the", "bark", "barks", "a"];
        Tree::build(NodeBuilder::with_children(
            "S",
            (0..10)
                .map(|i| {
                    NodeBuilder::with_children(
                        tags[(i + seed) % tags.len()],
                        (0..7)
                            .map(|j| NodeBuilder::new(words[(i * 3 + j + seed) % words.len()]))
                            .collect(),
                    )
                })
                .collect(),
        ))
    }

    #[test]
    fn test_parallel_prepass_matches_pairwise_scores() {
        let (a, b) = (wide(0), wide(1));
        assert!(a.num_nodes() * b.num_nodes() >= PARALLEL_PREPASS_PAIRS);

        let similarity = CharJaccardSimilarity;
        let threshold = 0.5;
        let mut cache = SparseDeltaCache::new();
        let (pairs, table) =
            similar_node_pairs(&a, &b, &similarity, threshold, &mut cache).unwrap();

        let mut expected = Vec::new();
        for &x in a.ordered_by_label() {
            for &y in b.ordered_by_label() {
                let sim = similarity.similarity(a.at(x).content(), b.at(y).content());
                assert_eq!(table.get(x, y), sim);
                if sim >= threshold {
                    assert_eq!(cache.lookup(x, y), None);
                    expected.push(NodePair { a: x, b: y });
                } else {
                    assert_eq!(cache.lookup(x, y), Some(0.0));
                }
            }
        }
        assert_eq!(pairs, expected);
        assert_eq!(cache.len(), a.num_nodes() * b.num_nodes());
    }
}
