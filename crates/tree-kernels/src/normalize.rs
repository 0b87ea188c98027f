//! Kernel normalization.
//!
//! Unnormalized tree kernels grow with tree size. Normalizing by the
//! self-similarities,
//!
//! ```text
//! K_norm(a, b) = K(a, b) / sqrt(K(a, a) · K(b, b))
//! ```
//!
//! maps every tree to unit length in feature space, so `K_norm(a, a) = 1`.

use crate::error::{KernelError, Result};
use crate::tree::{StructureElement, Tree};
use crate::types::TreeKernel;
use crate::workspace::KernelWorkspace;

/// Normalize a Gram matrix by its diagonal.
///
/// Rows and columns of entries whose self-similarity is 0 become 0.
///
/// # Errors
///
/// The matrix must be square with a non-negative diagonal.
pub fn normalize_gram_matrix(gram: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let n = gram.len();
    if gram.iter().any(|row| row.len() != n) {
        return Err(KernelError::ComputationError(
            "Gram matrix must be square".to_string(),
        ));
    }

    let sqrt_diag: Vec<f64> = (0..n)
        .map(|i| checked_self_similarity(gram[i][i]).map(f64::sqrt))
        .collect::<Result<_>>()?;

    let normalized = gram
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, &value)| scale(value, sqrt_diag[i] * sqrt_diag[j]))
                .collect()
        })
        .collect();
    Ok(normalized)
}

fn checked_self_similarity(value: f64) -> Result<f64> {
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(KernelError::ComputationError(format!(
            "self-similarity {} cannot be normalized",
            value
        )))
    }
}

fn scale(value: f64, norm: f64) -> f64 {
    if norm > 0.0 {
        value / norm
    } else {
        0.0
    }
}

/// Wrapper normalizing any tree kernel.
///
/// # Example
///
/// ```rust
/// use tree_kernels::{NodeBuilder, NormalizedTreeKernel, SubTreeKernel, Tree, TreeKernel};
///
/// let a: Tree = Tree::build(NodeBuilder::with_children(
///     "S",
///     vec![NodeBuilder::new("NP"), NodeBuilder::new("VP")],
/// ));
/// let b: Tree = Tree::build(NodeBuilder::with_children("S", vec![NodeBuilder::new("NP")]));
///
/// let kernel = NormalizedTreeKernel::new(SubTreeKernel::subset_tree(0.4).unwrap());
/// assert!((kernel.compute_trees(&a, &a).unwrap() - 1.0).abs() < 1e-12);
/// assert!(kernel.compute_trees(&a, &b).unwrap() < 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct NormalizedTreeKernel<K> {
    inner: K,
}

impl<K> NormalizedTreeKernel<K> {
    /// Wrap `inner`
    pub fn new(inner: K) -> Self {
        Self { inner }
    }

    /// The wrapped kernel
    pub fn inner(&self) -> &K {
        &self.inner
    }

    /// Unwrap
    pub fn into_inner(self) -> K {
        self.inner
    }
}

impl<C, K> TreeKernel<C> for NormalizedTreeKernel<K>
where
    C: StructureElement,
    K: TreeKernel<C>,
{
    fn compute_with(
        &self,
        workspace: &mut KernelWorkspace,
        a: &Tree<C>,
        b: &Tree<C>,
    ) -> Result<f64> {
        let k_ab = self.inner.compute_with(workspace, a, b)?;
        let k_aa = checked_self_similarity(self.inner.compute_with(workspace, a, a)?)?;
        let k_bb = checked_self_similarity(self.inner.compute_with(workspace, b, b)?)?;
        Ok(scale(k_ab, (k_aa * k_bb).sqrt()))
    }

    fn workspace(&self) -> KernelWorkspace {
        self.inner.workspace()
    }

    fn name(&self) -> &str {
        "Normalized"
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::gram::gram_matrix;
    use crate::partial_tree::{PartialTreeKernel, PartialTreeKernelConfig};
    use crate::tree::NodeBuilder;
    use approx::assert_relative_eq;

    #[test]
    fn test_normalize_gram_matrix_basic() {
        let K = vec![
            vec![4.0, 2.0, 1.0],
            vec![2.0, 9.0, 3.0],
            vec![1.0, 3.0, 16.0],
        ];
        let K_norm = normalize_gram_matrix(&K).unwrap();
        for (i, row) in K_norm.iter().enumerate() {
            assert_relative_eq!(row[i], 1.0);
        }
        assert_relative_eq!(K_norm[0][1], 2.0 / 6.0);
        assert_relative_eq!(K_norm[1][2], 3.0 / 12.0);
    }

    #[test]
    fn test_normalize_zero_diagonal() {
        let K = vec![vec![0.0, 0.0], vec![0.0, 4.0]];
        let K_norm = normalize_gram_matrix(&K).unwrap();
        assert_eq!(K_norm, vec![vec![0.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_normalize_rejects_bad_input() {
        assert!(normalize_gram_matrix(&[vec![1.0, 2.0]]).is_err());
        assert!(normalize_gram_matrix(&[vec![-1.0]]).is_err());
        assert!(normalize_gram_matrix(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_normalized_kernel_agrees_with_matrix() {
        let trees: Vec<Tree> = vec![
            Tree::build(NodeBuilder::with_children(
                "S",
                vec![NodeBuilder::new("NP"), NodeBuilder::new("VP")],
            )),
            Tree::build(NodeBuilder::with_children(
                "S",
                vec![NodeBuilder::with_children("NP", vec![NodeBuilder::new("N")])],
            )),
        ];
        let kernel = PartialTreeKernel::new(PartialTreeKernelConfig::new());
        let normalized = NormalizedTreeKernel::new(kernel.clone());

        let K_norm = normalize_gram_matrix(&gram_matrix(&kernel, &trees).unwrap()).unwrap();
        let direct = gram_matrix(&normalized, &trees).unwrap();
        for i in 0..trees.len() {
            for j in 0..trees.len() {
                assert_relative_eq!(K_norm[i][j], direct[i][j], epsilon = 1e-12);
            }
        }
        assert_relative_eq!(direct[1][1], 1.0, epsilon = 1e-12);
    }
}
