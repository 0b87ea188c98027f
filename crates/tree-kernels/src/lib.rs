//! # Tree-Kernels
//!
//! **Version**: 0.1.0 | **Status**: Beta
//!
//! Convolution kernels over labeled ordered trees, such as parse trees or
//! abstract syntax trees, for kernel machines (SVMs, kernel PCA, ...).
//!
//! ## Features
//!
//! - ✅ **SubTree / SubSetTree Kernels** - Production-gated fragment counting
//!   (Collins & Duffy 2001)
//! - ✅ **Partial Tree Kernel** - Fragments over child subsequences with gap
//!   decay (Moschitti 2006)
//! - ✅ **Smoothed Partial Tree Kernel** - PTK with a pluggable node similarity
//!   (Croce et al. 2011)
//! - ✅ **Fast Node Pairing** - Merge-join over memoized node orderings
//! - ✅ **Dense and Sparse Delta Caches** - Interchangeable memo backends
//! - ✅ **Parallel Gram Matrices** - rayon, one workspace per worker thread
//! - ✅ **Normalization** - `K(a, b) / sqrt(K(a, a) K(b, b))`
//!
//! ## Architecture
//!
//! ### Trees
//!
//! A [`Tree`] owns its nodes in an arena. Node ids are assigned in pre-order
//! starting at 1 and stay stable across edits; productions and node orderings
//! are memoized and invalidated by the editing methods.
//!
//! ```rust
//! use tree_kernels::{NodeBuilder, Tree};
//!
//! let mut tree: Tree = Tree::build(NodeBuilder::with_children(
//!     "S",
//!     vec![NodeBuilder::new("NP"), NodeBuilder::new("VP")],
//! ));
//! assert_eq!(tree.root().production(), "S->NP VP");
//!
//! let vp = tree.root().child(1).unwrap().id();
//! tree.add_child(vp, "V".to_string()).unwrap();
//! assert_eq!(tree.to_string(), "(S(NP)(VP(V)))");
//! ```
//!
//! ### Kernels
//!
//! All kernels implement [`TreeKernel`]. Kernels are immutable; the mutable
//! state of an evaluation lives in a [`KernelWorkspace`] that can be reused
//! between evaluations.
//!
//! ```rust
//! use tree_kernels::{
//!     gram_matrix, NodeBuilder, PartialTreeKernel, PartialTreeKernelConfig, Tree,
//! };
//!
//! let trees: Vec<Tree> = vec![
//!     Tree::build(NodeBuilder::with_children("S", vec![NodeBuilder::new("NP")])),
//!     Tree::build(NodeBuilder::with_children(
//!         "S",
//!         vec![NodeBuilder::new("NP"), NodeBuilder::new("VP")],
//!     )),
//! ];
//!
//! let config = PartialTreeKernelConfig::new().with_lambda(0.5).unwrap();
//! let kernel = PartialTreeKernel::new(config);
//! let gram = gram_matrix(&kernel, &trees).unwrap();
//! assert_eq!(gram[0][1], gram[1][0]);
//! ```
//!
//! ## References
//!
//! - Collins & Duffy (2001): "Convolution Kernels for Natural Language"
//! - Moschitti (2006): "Efficient Convolution Kernels for Dependency and
//!   Constituent Syntactic Trees"
//! - Croce, Moschitti & Basili (2011): "Structured Lexical Similarity via
//!   Convolution Kernels on Dependency Trees"

pub mod delta;
pub mod error;
pub mod gram;
pub mod normalize;
pub mod pairing;
pub mod partial_tree;
mod scratch;
pub mod similarity;
pub mod smoothed_partial_tree;
pub mod subtree;
pub mod tree;
pub mod types;
mod workspace;

pub use delta::{DeltaCache, DeltaCacheKind, DenseDeltaCache, SparseDeltaCache, NOT_COMPUTED};
pub use error::{KernelError, Result};
pub use gram::{cross_gram_matrix, gram_matrix};
pub use normalize::{normalize_gram_matrix, NormalizedTreeKernel};
pub use pairing::{find_common_nodes, similar_node_pairs, NodePair, SimilarityTable};
pub use partial_tree::{PartialTreeKernel, PartialTreeKernelConfig};
pub use scratch::RecursionLimits;
pub use similarity::{CharJaccardSimilarity, ExactMatchSimilarity, NodeSimilarity};
pub use smoothed_partial_tree::{SmoothedPartialTreeKernel, SmoothedPartialTreeKernelConfig};
pub use subtree::{SubTreeKernel, SubTreeKernelConfig, SubTreeVariant};
pub use tree::{NodeBuilder, NodeId, NodeRef, PreOrder, SortKey, StructureElement, Tree, TreeNode};
pub use types::TreeKernel;
pub use workspace::KernelWorkspace;
