//! Delta caches.
//!
//! A delta cache memoizes the delta function of a tree kernel for pairs of
//! nodes `(a, b)` where `a` belongs to the first tree and `b` to the second.
//! Node ids are only unique within a tree, so a cache is valid for exactly one
//! kernel evaluation and every kernel clears it before pairing nodes.
//!
//! Two backends share the [`DeltaCache`] contract but deliberately differ in
//! what an unseen pair reads as:
//!
//! | backend | unseen pair reads |
//! |---|---|
//! | [`DenseDeltaCache`] | [`NOT_COMPUTED`] |
//! | [`SparseDeltaCache`] | `0.0` |
//!
//! The kernels only recurse into pairs that were seeded during node pairing,
//! so both backends produce the same kernel values.

mod dense;
mod sparse;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tree::NodeId;

pub use dense::DenseDeltaCache;
pub use sparse::SparseDeltaCache;

/// Sentinel stored for a pair whose delta has not been computed yet.
pub const NOT_COMPUTED: f64 = -1.0;

/// Storage for partially or fully computed delta values.
pub trait DeltaCache: Debug + Send {
    /// Raw stored value, with backend-specific meaning for unseen pairs.
    fn get(&self, a: NodeId, b: NodeId) -> f64;

    /// Store a value (or [`NOT_COMPUTED`]) for a pair.
    fn add(&mut self, a: NodeId, b: NodeId, value: f64) -> Result<()>;

    /// Forget every entry.
    fn clear(&mut self);

    /// Number of pairs written since the last clear
    fn len(&self) -> usize;

    /// Whether nothing was written since the last clear
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached value, `None` while the pair is marked [`NOT_COMPUTED`].
    fn lookup(&self, a: NodeId, b: NodeId) -> Option<f64> {
        let value = self.get(a, b);
        if value == NOT_COMPUTED {
            None
        } else {
            Some(value)
        }
    }
}

/// Backend selection for kernel configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeltaCacheKind {
    /// Growable square grid; `max_side` is a hard limit on node ids
    ///
    /// Memory is quadratic in the largest node id: an unbounded grid for
    /// 100k-node trees needs tens of GiB. Set `max_side` to get
    /// [`KernelError::CacheCapacityExceeded`](crate::KernelError::CacheCapacityExceeded)
    /// instead, or use `Sparse` for large trees.
    Dense { max_side: Option<usize> },
    /// Map of maps; memory grows with the number of stored pairs
    Sparse,
}

impl DeltaCacheKind {
    /// Instantiate a fresh, empty cache of this kind
    pub fn build(self) -> Box<dyn DeltaCache> {
        match self {
            Self::Dense { max_side } => Box::new(DenseDeltaCache::with_limit(max_side)),
            Self::Sparse => Box::new(SparseDeltaCache::new()),
        }
    }
}

impl Default for DeltaCacheKind {
    fn default() -> Self {
        Self::Dense { max_side: None }
    }
}
