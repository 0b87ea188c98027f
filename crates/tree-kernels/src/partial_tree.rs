//! Partial Tree Kernel (Moschitti, ECML 2006).
//!
//! Unlike the production-gated kernels, a PTK fragment may keep any
//! subsequence of a node's children. Matching child subsequences are
//! weighted by a gap penalty, so
//!
//! ```text
//! Δ(a, b) = 0                                   if text(a) ≠ text(b)
//!         = μ · λ² · tf                         if a or b is a leaf
//!         = μ · (λ² + Σ_l Δ_p(c_a, c_b, l))     otherwise
//! ```
//!
//! where `Δ_p(·, ·, l)` scores the common child subsequences of length `l`
//! with gap decay `λ`, `μ` decays by depth and `tf` weighs terminals.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::delta::{DeltaCache, DeltaCacheKind};
use crate::error::{KernelError, Result};
use crate::pairing::find_common_nodes;
use crate::scratch::{RecursionLimits, ScratchBuffers, ScratchFrame};
use crate::tree::{NodeId, SortKey, StructureElement, Tree};
use crate::types::TreeKernel;
use crate::workspace::KernelWorkspace;

/// Configuration for [`PartialTreeKernel`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialTreeKernelConfig {
    /// Gap decay λ in (0, 1]
    pub lambda: f64,
    /// Depth decay μ in (0, 1]
    pub mu: f64,
    /// Extra weight of leaf matches, at least 0
    pub terminal_factor: f64,
    /// Longest child subsequence taken into account, unbounded when `None`
    pub max_subsequence_length: Option<usize>,
    /// Scratch caps
    pub limits: RecursionLimits,
    /// Delta cache backend
    pub cache: DeltaCacheKind,
}

impl PartialTreeKernelConfig {
    /// λ = μ = 0.4, terminal factor 1, no length cap, default limits
    pub fn new() -> Self {
        Self {
            lambda: 0.4,
            mu: 0.4,
            terminal_factor: 1.0,
            max_subsequence_length: None,
            limits: RecursionLimits::default(),
            cache: DeltaCacheKind::default(),
        }
    }

    /// Set the gap decay
    pub fn with_lambda(mut self, lambda: f64) -> Result<Self> {
        self.lambda = KernelError::check_decay("lambda", lambda)?;
        Ok(self)
    }

    /// Set the depth decay
    pub fn with_mu(mut self, mu: f64) -> Result<Self> {
        self.mu = KernelError::check_decay("mu", mu)?;
        Ok(self)
    }

    /// Set the terminal factor
    pub fn with_terminal_factor(mut self, terminal_factor: f64) -> Result<Self> {
        if !terminal_factor.is_finite() || terminal_factor < 0.0 {
            return Err(KernelError::invalid_parameter(
                "terminal_factor",
                terminal_factor,
                "must be finite and non-negative",
            ));
        }
        self.terminal_factor = terminal_factor;
        Ok(self)
    }

    /// Cap the child subsequence length
    pub fn with_max_subsequence_length(mut self, max_length: Option<usize>) -> Result<Self> {
        if max_length == Some(0) {
            return Err(KernelError::invalid_parameter(
                "max_subsequence_length",
                0,
                "must be at least 1",
            ));
        }
        self.max_subsequence_length = max_length;
        Ok(self)
    }

    /// Set the scratch caps
    pub fn with_limits(mut self, limits: RecursionLimits) -> Result<Self> {
        limits.validate()?;
        self.limits = limits;
        Ok(self)
    }

    /// Set the delta cache backend
    pub fn with_cache(mut self, cache: DeltaCacheKind) -> Self {
        self.cache = cache;
        self
    }

    /// Re-check a configuration built without the setters
    pub fn validate(&self) -> Result<()> {
        Self::new()
            .with_lambda(self.lambda)?
            .with_mu(self.mu)?
            .with_terminal_factor(self.terminal_factor)?
            .with_max_subsequence_length(self.max_subsequence_length)?
            .with_limits(self.limits)
            .map(|_| ())
    }
}

impl Default for PartialTreeKernelConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Partial Tree Kernel
///
/// Sums `Δ` over all pairs of nodes with equal labels.
///
/// # Example
///
/// ```rust
/// use tree_kernels::{NodeBuilder, PartialTreeKernel, PartialTreeKernelConfig, Tree};
///
/// let a: Tree = Tree::build(NodeBuilder::with_children(
///     "S",
///     vec![NodeBuilder::new("NP"), NodeBuilder::new("VP")],
/// ));
/// let b: Tree = Tree::build(NodeBuilder::with_children("S", vec![NodeBuilder::new("VP")]));
///
/// let kernel = PartialTreeKernel::new(PartialTreeKernelConfig::new());
/// // the roots share the child subsequence [VP]
/// assert!(kernel.compute_trees(&a, &b).unwrap() > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct PartialTreeKernel {
    config: PartialTreeKernelConfig,
}

impl PartialTreeKernel {
    /// Create a new kernel
    pub fn new(config: PartialTreeKernelConfig) -> Self {
        Self { config }
    }

    /// Kernel configuration
    pub fn config(&self) -> &PartialTreeKernelConfig {
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
        let KernelWorkspace { cache, scratch } = workspace;
        let cache = cache.as_mut();

        let pairs = find_common_nodes(a, b, SortKey::Label, cache)?;
        let delta = PartialTreeDelta {
            a,
            b,
            lambda: self.config.lambda,
            mu: self.config.mu,
            terminal_factor: self.config.terminal_factor,
            max_length: self.config.max_subsequence_length,
        };
        let mut sum = 0.0;
        for pair in &pairs {
            sum += delta.eval(cache, scratch, pair.a, pair.b)?;
        }

        debug!(
            "PartialTree kernel: {} candidate pairs, value {}",
            pairs.len(),
            sum
        );
        Ok(sum)
    }
}

impl<C: StructureElement> TreeKernel<C> for PartialTreeKernel {
    fn compute_with(
        &self,
        workspace: &mut KernelWorkspace,
        a: &Tree<C>,
        b: &Tree<C>,
    ) -> Result<f64> {
        PartialTreeKernel::compute_with(self, workspace, a, b)
    }

    fn workspace(&self) -> KernelWorkspace {
        PartialTreeKernel::workspace(self)
    }

    fn name(&self) -> &str {
        "PartialTree"
    }
}

struct PartialTreeDelta<'t, C> {
    a: &'t Tree<C>,
    b: &'t Tree<C>,
    lambda: f64,
    mu: f64,
    terminal_factor: f64,
    max_length: Option<usize>,
}

impl<C: StructureElement> PartialTreeDelta<'_, C> {
    fn eval(
        &self,
        cache: &mut dyn DeltaCache,
        scratch: &mut ScratchBuffers,
        x: NodeId,
        y: NodeId,
    ) -> Result<f64> {
        if let Some(value) = cache.lookup(x, y) {
            return Ok(value);
        }

        let (node_a, node_b) = (self.a.at(x), self.b.at(y));
        let lambda2 = self.lambda * self.lambda;
        let value = if !node_a.content().same_text(node_b.content()) {
            0.0
        } else if node_a.is_leaf() || node_b.is_leaf() {
            self.mu * lambda2 * self.terminal_factor
        } else {
            let (children_a, children_b) = (node_a.children(), node_b.children());
            let mut frame = scratch.enter(x, children_a.len(), y, children_b.len())?;
            let score = subsequence_score(
                &mut frame,
                children_a.len(),
                children_b.len(),
                self.lambda,
                self.max_length,
                |i, j| {
                    let (cx, cy) = (children_a[i], children_b[j]);
                    if self.a.at(cx).content().same_text(self.b.at(cy).content()) {
                        self.eval(&mut *cache, &mut *scratch, cx, cy)
                    } else {
                        Ok(0.0)
                    }
                },
            );
            scratch.leave(frame);
            self.mu * (lambda2 + score?)
        };

        cache.add(x, y, value)?;
        Ok(value)
    }
}

/// Gap-weighted score of the common subsequences of two child lists.
///
/// `child_delta(i, j)` is the delta of the `i`-th child of the first node and
/// the `j`-th child of the second, 0 for children that cannot match. Lengths
/// run from 1 up to the shorter list (or `max_length`).
pub(crate) fn subsequence_score(
    frame: &mut ScratchFrame,
    n: usize,
    m: usize,
    lambda: f64,
    max_length: Option<usize>,
    mut child_delta: impl FnMut(usize, usize) -> Result<f64>,
) -> Result<f64> {
    let ScratchFrame {
        deltas,
        dps,
        dp,
        kernel_mat,
    } = frame;
    let lambda2 = lambda * lambda;

    // subsequences of length 1
    for i in 1..=n {
        for j in 1..=m {
            let delta = child_delta(i - 1, j - 1)?;
            deltas.set(i, j, delta);
            dps.set(i, j, delta);
            kernel_mat[0] += delta;
        }
    }

    let p = max_length.map_or(n.min(m), |cap| cap.min(n).min(m));
    for l in 1..p {
        for j in 0..=m {
            dp.set(l - 1, j, 0.0);
        }
        for i in 0..=n {
            dp.set(i, l - 1, 0.0);
        }
        for i in l..=n {
            for j in l..=m {
                let value = dps.get(i, j) + lambda * dp.get(i - 1, j) + lambda * dp.get(i, j - 1)
                    - lambda2 * dp.get(i - 1, j - 1);
                dp.set(i, j, value);

                let delta = deltas.get(i, j);
                if delta != 0.0 {
                    let extended = delta * dp.get(i - 1, j - 1);
                    dps.set(i, j, extended);
                    kernel_mat[l] += extended;
                }
            }
        }
    }

    Ok(kernel_mat[..p].iter().sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeBuilder;
    use approx::assert_relative_eq;

    fn flat(root: &str, children: &[&str]) -> Tree {
        Tree::build(NodeBuilder::with_children(
            root,
            children.iter().map(|&c| NodeBuilder::new(c)).collect(),
        ))
    }

    fn sentence() -> Tree {
        Tree::build(NodeBuilder::with_children(
            "S",
            vec![
                NodeBuilder::with_children(
                    "NP",
                    vec![NodeBuilder::new("D"), NodeBuilder::new("N")],
                ),
                NodeBuilder::with_children("VP", vec![NodeBuilder::new("V"), NodeBuilder::new("NP")]),
            ],
        ))
    }

    fn kernel() -> PartialTreeKernel {
        PartialTreeKernel::new(PartialTreeKernelConfig::new())
    }

    #[test]
    fn test_single_leaf() {
        let tree: Tree = Tree::leaf("x".to_string());
        // μ λ² tf
        assert_relative_eq!(kernel().compute_trees(&tree, &tree).unwrap(), 0.064, epsilon = 1e-12);
    }

    #[test]
    fn test_one_child() {
        let tree = flat("S", &["A"]);
        // leaf pair 0.064; root μ(λ² + 0.064)
        let root = 0.4 * (0.16 + 0.064);
        assert_relative_eq!(
            kernel().compute_trees(&tree, &tree).unwrap(),
            0.064 + root,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_two_children() {
        let tree = flat("S", &["A", "B"]);
        let leaf = 0.064;
        // [A], [B] and the contiguous [A B]
        let score = 2.0 * leaf + leaf * leaf;
        let expected = 2.0 * leaf + 0.4 * (0.16 + score);
        assert_relative_eq!(kernel().compute_trees(&tree, &tree).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_gap_is_penalized() {
        let leaf = 0.064;
        let a = flat("S", &["A", "X", "B"]);
        let b = flat("S", &["A", "B"]);
        // [A] and [B], plus [A B] with one gap in the first list
        let score = 2.0 * leaf + leaf * leaf * 0.4;
        let expected = 2.0 * leaf + 0.4 * (0.16 + score);
        assert_relative_eq!(kernel().compute_trees(&a, &b).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_subsequence_cap() {
        let config = PartialTreeKernelConfig::new()
            .with_max_subsequence_length(Some(1))
            .unwrap();
        let tree = flat("S", &["A", "B"]);
        let leaf = 0.064;
        let expected = 2.0 * leaf + 0.4 * (0.16 + 2.0 * leaf);
        assert_relative_eq!(
            PartialTreeKernel::new(config).compute_trees(&tree, &tree).unwrap(),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_disjoint_vocabulary() {
        let a = flat("S", &["A", "B"]);
        let b = flat("T", &["C", "D"]);
        assert_eq!(kernel().compute_trees(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_symmetry_and_positivity() {
        let (a, b) = (sentence(), flat("VP", &["V", "NP"]));
        let k = kernel();
        let ab = k.compute_trees(&a, &b).unwrap();
        assert_relative_eq!(ab, k.compute_trees(&b, &a).unwrap(), epsilon = 1e-12);
        assert!(k.compute_trees(&a, &a).unwrap() > 0.0);
        assert!(ab > 0.0);
    }

    #[test]
    fn test_cache_backends_agree() {
        let (a, b) = (sentence(), sentence());
        let dense = kernel().compute_trees(&a, &b).unwrap();
        let sparse = PartialTreeKernel::new(
            PartialTreeKernelConfig::new().with_cache(DeltaCacheKind::Sparse),
        )
        .compute_trees(&a, &b)
        .unwrap();
        assert_relative_eq!(dense, sparse, epsilon = 1e-12);
    }

    #[test]
    fn test_fan_out_limit() {
        let limits = RecursionLimits::new().with_max_children(2).unwrap();
        let config = PartialTreeKernelConfig::new().with_limits(limits).unwrap();
        let tree = flat("S", &["A", "B", "C"]);
        let err = PartialTreeKernel::new(config)
            .compute_trees(&tree, &tree)
            .unwrap_err();
        assert!(matches!(err, KernelError::FanOutExceeded { children: 3, limit: 2, .. }));
    }

    #[test]
    fn test_depth_limit() {
        let limits = RecursionLimits::new().with_max_depth(1).unwrap();
        let config = PartialTreeKernelConfig::new().with_limits(limits).unwrap();
        let tree = sentence();
        let err = PartialTreeKernel::new(config)
            .compute_trees(&tree, &tree)
            .unwrap_err();
        assert_eq!(err, KernelError::RecursionDepthExceeded { limit: 1 });
    }

    #[test]
    fn test_workspace_survives_failed_evaluation() {
        let limits = RecursionLimits::new().with_max_depth(1).unwrap();
        let strict = PartialTreeKernel::new(PartialTreeKernelConfig::new().with_limits(limits).unwrap());
        let relaxed = kernel();
        let tree = sentence();

        let mut workspace = relaxed.workspace();
        assert!(strict.compute_with(&mut workspace, &tree, &tree).is_err());
        let reused = relaxed.compute_with(&mut workspace, &tree, &tree).unwrap();
        assert_relative_eq!(reused, relaxed.compute_trees(&tree, &tree).unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn test_config_validation() {
        assert!(PartialTreeKernelConfig::new().with_mu(0.0).is_err());
        assert!(PartialTreeKernelConfig::new().with_lambda(2.0).is_err());
        assert!(PartialTreeKernelConfig::new().with_terminal_factor(-1.0).is_err());
        assert!(PartialTreeKernelConfig::new()
            .with_terminal_factor(f64::INFINITY)
            .is_err());
        assert!(PartialTreeKernelConfig::new()
            .with_max_subsequence_length(Some(0))
            .is_err());
        assert!(PartialTreeKernelConfig::new().with_terminal_factor(0.0).is_ok());

        let config = PartialTreeKernelConfig {
            mu: 3.0,
            ..PartialTreeKernelConfig::new()
        };
        assert!(config.validate().is_err());
        assert!(PartialTreeKernelConfig::new().validate().is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "lambda": 0.5,
            "mu": 0.8,
            "terminal_factor": 2.0,
            "max_subsequence_length": 3,
            "limits": { "max_depth": 10, "max_children": 20 },
            "cache": "Sparse"
        }"#;
        let config: PartialTreeKernelConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.max_subsequence_length, Some(3));
        assert_eq!(config.limits.max_children, 20);
        assert_eq!(config.cache, DeltaCacheKind::Sparse);
    }
}
