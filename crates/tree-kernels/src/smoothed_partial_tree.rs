//! Smoothed Partial Tree Kernel (Croce, Moschitti & Basili, EMNLP 2011).
//!
//! The PTK recursion with exact node matching replaced by a similarity score
//! `σ(a, b)`:
//!
//! ```text
//! Δ(a, b) = 0                                     if σ(a, b) < threshold
//!         = μ · λ² · tf · σ(a, b)                 if a or b is a leaf
//!         = σ(a, b) · μ · (λ² + Σ_l Δ_p(...))     otherwise
//! ```
//!
//! Every child pair takes part in `Δ_p`; pairs below the threshold contribute
//! nothing.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::delta::DeltaCache;
use crate::error::{KernelError, Result};
use crate::pairing::{similar_node_pairs, SimilarityTable};
use crate::partial_tree::{subsequence_score, PartialTreeKernelConfig};
use crate::scratch::ScratchBuffers;
use crate::similarity::NodeSimilarity;
use crate::tree::{NodeId, StructureElement, Tree};
use crate::types::TreeKernel;
use crate::workspace::KernelWorkspace;

/// Configuration for [`SmoothedPartialTreeKernel`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedPartialTreeKernelConfig {
    /// λ, μ, terminal factor, subsequence cap, limits and cache backend
    #[serde(flatten)]
    pub partial: PartialTreeKernelConfig,
    /// Node pairs less similar than this never match
    pub similarity_threshold: f64,
}

impl SmoothedPartialTreeKernelConfig {
    /// PTK defaults with a similarity threshold of 0.01
    pub fn new() -> Self {
        Self {
            partial: PartialTreeKernelConfig::new(),
            similarity_threshold: 0.01,
        }
    }

    /// Smoothed kernel with the decays, caps and cache of `partial`
    pub fn from_partial(partial: PartialTreeKernelConfig) -> Self {
        Self {
            partial,
            ..Self::new()
        }
    }

    /// Set the similarity threshold
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(KernelError::invalid_parameter(
                "similarity_threshold",
                threshold,
                "must be between 0.0 and 1.0",
            ));
        }
        self.similarity_threshold = threshold;
        Ok(self)
    }

    /// Re-check a configuration built without the setters
    pub fn validate(&self) -> Result<()> {
        self.partial.validate()?;
        Self::new()
            .with_similarity_threshold(self.similarity_threshold)
            .map(|_| ())
    }
}

impl Default for SmoothedPartialTreeKernelConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Smoothed Partial Tree Kernel over a pluggable node similarity
///
/// # Example
///
/// ```rust
/// use tree_kernels::{
///     CharJaccardSimilarity, NodeBuilder, SmoothedPartialTreeKernel,
///     SmoothedPartialTreeKernelConfig, Tree,
/// };
///
/// let a: Tree = Tree::build(NodeBuilder::with_children("NP", vec![NodeBuilder::new("NN")]));
/// let b: Tree = Tree::build(NodeBuilder::with_children("NP", vec![NodeBuilder::new("NNS")]));
///
/// let kernel = SmoothedPartialTreeKernel::new(
///     SmoothedPartialTreeKernelConfig::new(),
///     CharJaccardSimilarity,
/// );
/// // NN and NNS are similar, so the NP roots share a smoothed fragment
/// assert!(kernel.compute_trees(&a, &b).unwrap() > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct SmoothedPartialTreeKernel<S> {
    config: SmoothedPartialTreeKernelConfig,
    similarity: S,
}

impl<S> SmoothedPartialTreeKernel<S> {
    /// Create a new kernel
    pub fn new(config: SmoothedPartialTreeKernelConfig, similarity: S) -> Self {
        Self { config, similarity }
    }

    /// Kernel configuration
    pub fn config(&self) -> &SmoothedPartialTreeKernelConfig {
        &self.config
    }

    /// Node similarity in use
    pub fn similarity(&self) -> &S {
        &self.similarity
    }

    /// A workspace with this kernel's cache backend and limits
    pub fn workspace(&self) -> KernelWorkspace {
        KernelWorkspace::new(self.config.partial.cache, self.config.partial.limits)
    }

    /// Evaluate the kernel in a fresh workspace
    pub fn compute_trees<C>(&self, a: &Tree<C>, b: &Tree<C>) -> Result<f64>
    where
        C: StructureElement,
        S: NodeSimilarity<C>,
    {
        self.compute_with(&mut self.workspace(), a, b)
    }

    /// Evaluate the kernel, reusing `workspace`
    pub fn compute_with<C>(
        &self,
        workspace: &mut KernelWorkspace,
        a: &Tree<C>,
        b: &Tree<C>,
    ) -> Result<f64>
    where
        C: StructureElement,
        S: NodeSimilarity<C>,
    {
        let partial = &self.config.partial;
        workspace.begin(partial.limits);
        let KernelWorkspace { cache, scratch } = workspace;
        let cache = cache.as_mut();

        let (pairs, table) = similar_node_pairs(
            a,
            b,
            &self.similarity,
            self.config.similarity_threshold,
            cache,
        )?;
        let delta = SmoothedDelta {
            a,
            b,
            table,
            lambda: partial.lambda,
            mu: partial.mu,
            terminal_factor: partial.terminal_factor,
            max_length: partial.max_subsequence_length,
        };
        let mut sum = 0.0;
        for pair in &pairs {
            sum += delta.eval(cache, scratch, pair.a, pair.b)?;
        }

        debug!(
            "SmoothedPartialTree kernel: {} candidate pairs, value {}",
            pairs.len(),
            sum
        );
        Ok(sum)
    }
}

impl<C, S> TreeKernel<C> for SmoothedPartialTreeKernel<S>
where
    C: StructureElement,
    S: NodeSimilarity<C>,
{
    fn compute_with(
        &self,
        workspace: &mut KernelWorkspace,
        a: &Tree<C>,
        b: &Tree<C>,
    ) -> Result<f64> {
        SmoothedPartialTreeKernel::compute_with(self, workspace, a, b)
    }

    fn workspace(&self) -> KernelWorkspace {
        SmoothedPartialTreeKernel::workspace(self)
    }

    fn name(&self) -> &str {
        "SmoothedPartialTree"
    }
}

struct SmoothedDelta<'t, C> {
    a: &'t Tree<C>,
    b: &'t Tree<C>,
    table: SimilarityTable,
    lambda: f64,
    mu: f64,
    terminal_factor: f64,
    max_length: Option<usize>,
}

impl<C: StructureElement> SmoothedDelta<'_, C> {
    fn eval(
        &self,
        cache: &mut dyn DeltaCache,
        scratch: &mut ScratchBuffers,
        x: NodeId,
        y: NodeId,
    ) -> Result<f64> {
        // pruned pairs were cached as 0 by the pre-pass
        if let Some(value) = cache.lookup(x, y) {
            return Ok(value);
        }

        let (node_a, node_b) = (self.a.at(x), self.b.at(y));
        let similarity = self.table.get(x, y);
        let lambda2 = self.lambda * self.lambda;
        let value = if node_a.is_leaf() || node_b.is_leaf() {
            self.mu * lambda2 * self.terminal_factor * similarity
        } else {
            let (children_a, children_b) = (node_a.children(), node_b.children());
            let mut frame = scratch.enter(x, children_a.len(), y, children_b.len())?;
            let score = subsequence_score(
                &mut frame,
                children_a.len(),
                children_b.len(),
                self.lambda,
                self.max_length,
                |i, j| self.eval(&mut *cache, &mut *scratch, children_a[i], children_b[j]),
            );
            scratch.leave(frame);
            similarity * self.mu * (lambda2 + score?)
        };

        cache.add(x, y, value)?;
        Ok(value)
    }
}
