//! Per-evaluation mutable state.

use crate::delta::{DeltaCache, DeltaCacheKind};
use crate::scratch::{RecursionLimits, ScratchBuffers};

/// Delta cache and scratch frames owned by one evaluation at a time.
///
/// Kernels are immutable and can be shared between threads; everything an
/// evaluation writes lives here. A workspace may be reused for any number of
/// sequential evaluations (the kernel clears it first), but never for two
/// evaluations at once, which the `&mut` borrow guarantees.
///
/// # Example
///
/// ```rust
/// use tree_kernels::{NodeBuilder, SubTreeKernel, SubTreeKernelConfig, Tree};
///
/// let kernel = SubTreeKernel::new(SubTreeKernelConfig::new());
/// let mut workspace = kernel.workspace();
///
/// let a: Tree = Tree::build(NodeBuilder::with_children("S", vec![NodeBuilder::new("NP")]));
/// let b: Tree = Tree::build(NodeBuilder::with_children("S", vec![NodeBuilder::new("VP")]));
///
/// let k_ab = kernel.compute_with(&mut workspace, &a, &b).unwrap();
/// let k_aa = kernel.compute_with(&mut workspace, &a, &a).unwrap();
/// assert!(k_aa > k_ab);
/// ```
#[derive(Debug)]
pub struct KernelWorkspace {
    pub(crate) cache: Box<dyn DeltaCache>,
    pub(crate) scratch: ScratchBuffers,
}

impl KernelWorkspace {
    /// Workspace with a fresh cache of `kind`
    pub fn new(kind: DeltaCacheKind, limits: RecursionLimits) -> Self {
        Self::with_cache(kind.build(), limits)
    }

    /// Workspace around a caller-provided cache
    pub fn with_cache(cache: Box<dyn DeltaCache>, limits: RecursionLimits) -> Self {
        Self {
            cache,
            scratch: ScratchBuffers::new(limits),
        }
    }

    /// Delta cache, as left by the last evaluation
    pub fn cache(&self) -> &dyn DeltaCache {
        self.cache.as_ref()
    }

    /// Scratch limits in force
    pub fn limits(&self) -> RecursionLimits {
        self.scratch.limits()
    }

    /// Start a new evaluation: empty cache, no frames checked out, limits of
    /// the kernel about to run.
    pub(crate) fn begin(&mut self, limits: RecursionLimits) {
        self.cache.clear();
        self.scratch.reset();
        self.scratch.set_limits(limits);
    }
}

impl Default for KernelWorkspace {
    fn default() -> Self {
        Self::new(DeltaCacheKind::default(), RecursionLimits::default())
    }
}
