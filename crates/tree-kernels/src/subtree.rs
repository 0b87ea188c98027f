//! SubTree and SubSetTree kernels.
//!
//! Both kernels count common tree fragments whose nodes expand by the same
//! production (Collins & Duffy 2001, Vishwanathan & Smola 2002). They share
//! one delta function, parameterized by `σ`:
//!
//! ```text
//! Δ(a, b) = 0                                  if prod(a) ≠ prod(b)
//!         = λ                                  if a and b are leaves
//!         = λ · Π_i (σ + Δ(a_i, b_i))          otherwise
//! ```
//!
//! where the product runs over the same-index child pairs with equal
//! productions. `σ = 0` only counts complete subtrees (ST), `σ = 1` also
//! counts fragments cut anywhere below the root (SST).

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::delta::{DeltaCache, DeltaCacheKind};
use crate::error::{KernelError, Result};
use crate::pairing::find_common_nodes;
use crate::scratch::RecursionLimits;
use crate::tree::{NodeId, SortKey, StructureElement, Tree};
use crate::types::TreeKernel;
use crate::workspace::KernelWorkspace;

/// Which fragments the kernel counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubTreeVariant {
    /// Complete subtrees down to the leaves (σ = 0)
    SubTree,
    /// Any fragment made of whole productions (σ = 1)
    SubSetTree,
}

impl SubTreeVariant {
    /// The `σ` term of the delta product
    pub fn sigma(self) -> f64 {
        match self {
            Self::SubTree => 0.0,
            Self::SubSetTree => 1.0,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::SubTree => "SubTree",
            Self::SubSetTree => "SubSetTree",
        }
    }
}

/// Configuration for [`SubTreeKernel`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubTreeKernelConfig {
    /// Decay factor λ in (0, 1]
    pub lambda: f64,
    /// ST or SST
    pub variant: SubTreeVariant,
    /// Whether leaves take part in the kernel
    pub include_leaves: bool,
    /// Delta cache backend
    pub cache: DeltaCacheKind,
    /// Depth cap on the delta recursion; `max_children` is not used
    #[serde(default)]
    pub limits: RecursionLimits,
}

impl SubTreeKernelConfig {
    /// SubTree kernel with λ = 0.4, leaves included, dense cache
    pub fn new() -> Self {
        Self {
            lambda: 0.4,
            variant: SubTreeVariant::SubTree,
            include_leaves: true,
            cache: DeltaCacheKind::default(),
            limits: RecursionLimits::default(),
        }
    }

    /// Same defaults, counting SubSetTree fragments
    pub fn subset_tree() -> Self {
        Self::new().with_variant(SubTreeVariant::SubSetTree)
    }

    /// Set the decay factor
    pub fn with_lambda(mut self, lambda: f64) -> Result<Self> {
        self.lambda = KernelError::check_decay("lambda", lambda)?;
        Ok(self)
    }

    /// Set the variant
    pub fn with_variant(mut self, variant: SubTreeVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Include or skip leaves
    ///
    /// Without leaves only internal nodes are paired, and leaf children do
    /// not contribute to the delta product.
    pub fn with_include_leaves(mut self, include_leaves: bool) -> Self {
        self.include_leaves = include_leaves;
        self
    }

    /// Set the delta cache backend
    pub fn with_cache(mut self, cache: DeltaCacheKind) -> Self {
        self.cache = cache;
        self
    }

    /// Set the recursion limits
    ///
    /// The delta recurses once per level of matching productions, so
    /// `max_depth` bounds the height of the fragments the kernel can follow.
    pub fn with_limits(mut self, limits: RecursionLimits) -> Result<Self> {
        limits.validate()?;
        self.limits = limits;
        Ok(self)
    }

    /// Re-check a configuration built without the setters
    pub fn validate(&self) -> Result<()> {
        KernelError::check_decay("lambda", self.lambda)?;
        self.limits.validate()
    }
}

impl Default for SubTreeKernelConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// SubTree / SubSetTree kernel
///
/// ## Formula
///
/// ```text
/// K(T1, T2) = Σ_{(a, b) : prod(a) = prod(b)} Δ(a, b)
/// ```
///
/// # Example
///
/// ```rust
/// use tree_kernels::{NodeBuilder, SubTreeKernel, SubTreeKernelConfig, Tree};
///
/// let tree: Tree = Tree::build(NodeBuilder::with_children(
///     "S",
///     vec![NodeBuilder::new("NP"), NodeBuilder::new("VP")],
/// ));
/// let kernel = SubTreeKernel::new(SubTreeKernelConfig::new());
///
/// // λ + λ for the leaves, λ · λ · λ for the root
/// let value = kernel.compute_trees(&tree, &tree).unwrap();
/// assert!((value - 0.864).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct SubTreeKernel {
    config: SubTreeKernelConfig,
}

impl SubTreeKernel {
    /// Create a new kernel
    pub fn new(config: SubTreeKernelConfig) -> Self {
        Self { config }
    }

    /// SubTree kernel with decay `lambda`
    pub fn subtree(lambda: f64) -> Result<Self> {
        Ok(Self::new(SubTreeKernelConfig::new().with_lambda(lambda)?))
    }

    /// SubSetTree kernel with decay `lambda`
    pub fn subset_tree(lambda: f64) -> Result<Self> {
        Ok(Self::new(
            SubTreeKernelConfig::subset_tree().with_lambda(lambda)?,
        ))
    }

    /// Kernel configuration
    pub fn config(&self) -> &SubTreeKernelConfig {
        &self.config
    }

    /// A workspace with this kernel's cache backend and limits
    pub fn workspace(&self) -> KernelWorkspace {
        KernelWorkspace::new(self.config.cache, self.config.limits)
    }

    /// Evaluate the kernel in a fresh workspace
    pub fn compute_trees<C: StructureElement>(&self, a: &Tree<C>, b: &Tree<C>) -> Result<f64> {
        self.compute_with(&mut self.workspace(), a, b)
    }

    /// Evaluate the kernel, reusing `workspace`
    pub fn compute_with<C: StructureElement>(
        &self,
        workspace: &mut KernelWorkspace,
        a: &Tree<C>,
        b: &Tree<C>,
    ) -> Result<f64> {
        workspace.begin(self.config.limits);

        let key = if self.config.include_leaves {
            SortKey::Production
        } else {
            SortKey::ProductionIgnoringLeaves
        };
        let cache = workspace.cache.as_mut();
        let pairs = find_common_nodes(a, b, key, cache)?;

        let delta = ProductionDelta {
            a,
            b,
            lambda: self.config.lambda,
            sigma: self.config.variant.sigma(),
            include_leaves: self.config.include_leaves,
            max_depth: self.config.limits.max_depth,
        };
        let mut sum = 0.0;
        for pair in &pairs {
            sum += delta.eval(cache, pair.a, pair.b, 0)?;
        }

        debug!(
            "{} kernel: {} candidate pairs, value {}",
            self.config.variant.name(),
            pairs.len(),
            sum
        );
        Ok(sum)
    }
}

impl<C: StructureElement> TreeKernel<C> for SubTreeKernel {
    fn compute_with(
        &self,
        workspace: &mut KernelWorkspace,
        a: &Tree<C>,
        b: &Tree<C>,
    ) -> Result<f64> {
        SubTreeKernel::compute_with(self, workspace, a, b)
    }

    fn workspace(&self) -> KernelWorkspace {
        SubTreeKernel::workspace(self)
    }

    fn name(&self) -> &str {
        self.config.variant.name()
    }
}

/// The production-gated delta function shared by ST and SST.
struct ProductionDelta<'t, C> {
    a: &'t Tree<C>,
    b: &'t Tree<C>,
    lambda: f64,
    sigma: f64,
    include_leaves: bool,
    max_depth: usize,
}

impl<C: StructureElement> ProductionDelta<'_, C> {
    fn eval(&self, cache: &mut dyn DeltaCache, x: NodeId, y: NodeId, depth: usize) -> Result<f64> {
        if let Some(value) = cache.lookup(x, y) {
            return Ok(value);
        }

        let value = if !self.same_production(x, y) {
            0.0
        } else {
            let (node_a, node_b) = (self.a.at(x), self.b.at(y));
            if node_a.has_children() && depth >= self.max_depth {
                warn!("delta recursion reached depth {}", depth);
                return Err(KernelError::RecursionDepthExceeded {
                    limit: self.max_depth,
                });
            }
            let mut product = self.lambda;
            for (&cx, &cy) in node_a.children().iter().zip(node_b.children()) {
                if !self.include_leaves && (self.a.at(cx).is_leaf() || self.b.at(cy).is_leaf()) {
                    continue;
                }
                if self.same_production(cx, cy) {
                    product *= self.sigma + self.eval(cache, cx, cy, depth + 1)?;
                }
            }
            product
        };

        cache.add(x, y, value)?;
        Ok(value)
    }

    /// Equal production strings, confirmed node by node.
    ///
    /// The rendered production does not escape its separators, so `X -> "A B"`
    /// and `X -> A B` render alike; the labels and child counts decide.
    fn same_production(&self, x: NodeId, y: NodeId) -> bool {
        if self.a.production_of(x) != self.b.production_of(y) {
            return false;
        }
        let (node_a, node_b) = (self.a.at(x), self.b.at(y));
        node_a.text() == node_b.text()
            && node_a.num_children() == node_b.num_children()
            && node_a
                .children()
                .iter()
                .zip(node_b.children())
                .all(|(&cx, &cy)| self.a.at(cx).text() == self.b.at(cy).text())
    }
}
