//! Core types for tree kernel evaluation.

use crate::error::Result;
use crate::tree::{StructureElement, Tree};
use crate::workspace::KernelWorkspace;

/// Convolution kernel over pairs of trees.
///
/// Implementations are immutable and shareable across threads. Every
/// evaluation writes into a [`KernelWorkspace`], either a fresh one
/// ([`compute_trees`](Self::compute_trees)) or one owned by the caller
/// ([`compute_with`](Self::compute_with)), which saves the allocations when
/// many pairs are evaluated in a row.
pub trait TreeKernel<C: StructureElement>: Send + Sync {
    /// Evaluate the kernel, reusing `workspace`.
    ///
    /// The workspace is cleared first, so it may carry leftovers from a
    /// previous evaluation, including one that failed.
    fn compute_with(
        &self,
        workspace: &mut KernelWorkspace,
        a: &Tree<C>,
        b: &Tree<C>,
    ) -> Result<f64>;

    /// A workspace configured for this kernel.
    fn workspace(&self) -> KernelWorkspace;

    /// Evaluate the kernel in a fresh workspace.
    fn compute_trees(&self, a: &Tree<C>, b: &Tree<C>) -> Result<f64> {
        let mut workspace = self.workspace();
        self.compute_with(&mut workspace, a, b)
    }

    /// Kernel name for identification.
    fn name(&self) -> &str;
}
