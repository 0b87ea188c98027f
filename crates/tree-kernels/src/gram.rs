//! Kernel matrices over collections of trees.
//!
//! Pairs are evaluated in parallel with rayon. Every worker thread keeps one
//! [`KernelWorkspace`](crate::KernelWorkspace) for all the pairs it handles,
//! so caches and scratch frames are allocated once per thread instead of once
//! per pair.

use log::debug;
use rayon::prelude::*;

use crate::error::Result;
use crate::tree::{StructureElement, Tree};
use crate::types::TreeKernel;

/// Symmetric matrix `K[i][j] = kernel(trees[i], trees[j])`.
///
/// Only the upper triangle is evaluated.
pub fn gram_matrix<C, K>(kernel: &K, trees: &[Tree<C>]) -> Result<Vec<Vec<f64>>>
where
    C: StructureElement,
    K: TreeKernel<C> + ?Sized,
{
    let n = trees.len();
    let pairs: Vec<(usize, usize)> = (0..n).flat_map(|i| (i..n).map(move |j| (i, j))).collect();
    let values = evaluate(kernel, &pairs, trees, trees)?;

    let mut matrix = vec![vec![0.0; n]; n];
    for (&(i, j), value) in pairs.iter().zip(values) {
        matrix[i][j] = value;
        matrix[j][i] = value;
    }

    debug!(
        "{} Gram matrix: {}x{}, {} evaluations",
        kernel.name(),
        n,
        n,
        pairs.len()
    );
    Ok(matrix)
}

/// Rectangular matrix `K[i][j] = kernel(rows[i], cols[j])`.
pub fn cross_gram_matrix<C, K>(
    kernel: &K,
    rows: &[Tree<C>],
    cols: &[Tree<C>],
) -> Result<Vec<Vec<f64>>>
where
    C: StructureElement,
    K: TreeKernel<C> + ?Sized,
{
    let pairs: Vec<(usize, usize)> = (0..rows.len())
        .flat_map(|i| (0..cols.len()).map(move |j| (i, j)))
        .collect();
    let values = evaluate(kernel, &pairs, rows, cols)?;

    let matrix: Vec<Vec<f64>> = if cols.is_empty() {
        vec![Vec::new(); rows.len()]
    } else {
        values.chunks(cols.len()).map(<[f64]>::to_vec).collect()
    };

    debug!(
        "{} cross Gram matrix: {}x{}",
        kernel.name(),
        rows.len(),
        cols.len()
    );
    Ok(matrix)
}

fn evaluate<C, K>(
    kernel: &K,
    pairs: &[(usize, usize)],
    rows: &[Tree<C>],
    cols: &[Tree<C>],
) -> Result<Vec<f64>>
where
    C: StructureElement,
    K: TreeKernel<C> + ?Sized,
{
    pairs
        .par_iter()
        .map_init(
            || kernel.workspace(),
            |workspace, &(i, j)| kernel.compute_with(workspace, &rows[i], &cols[j]),
        )
        .collect()
}
