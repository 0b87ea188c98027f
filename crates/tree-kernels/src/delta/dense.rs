use log::trace;

use super::{DeltaCache, NOT_COMPUTED};
use crate::error::{KernelError, Result};
use crate::tree::NodeId;

const DEFAULT_SIDE: usize = 64;

/// Square grid indexed by raw node ids.
///
/// Writes outside the grid grow it (at least doubling) and keep every stored
/// value. Clearing is O(1): each cell carries the generation it was written
/// in, and cells from older generations read as [`NOT_COMPUTED`].
///
/// With a `max_side` limit, a write whose id needs a larger grid fails with
/// [`KernelError::CacheCapacityExceeded`] instead of growing.
///
/// The grid holds `side²` values and `side²` stamps (12 bytes per cell), so
/// a single pair of ids near 100 000 asks for over 100 GiB. Trees of that
/// size should use a `max_side` limit or the
/// [`SparseDeltaCache`](super::SparseDeltaCache).
#[derive(Debug, Clone)]
pub struct DenseDeltaCache {
    side: usize,
    values: Vec<f64>,
    stamps: Vec<u32>,
    generation: u32,
    len: usize,
    max_side: Option<usize>,
}

impl DenseDeltaCache {
    /// Unbounded cache with the default initial size
    pub fn new() -> Self {
        Self::with_side(DEFAULT_SIDE, None)
    }

    /// Cache that refuses to grow past `max_side`
    pub fn with_limit(max_side: Option<usize>) -> Self {
        let side = max_side.map_or(DEFAULT_SIDE, |max| max.min(DEFAULT_SIDE));
        Self::with_side(side, max_side)
    }

    /// Cache preallocated for ids below `side`
    pub fn with_side(side: usize, max_side: Option<usize>) -> Self {
        Self {
            side,
            values: vec![0.0; side * side],
            stamps: vec![0; side * side],
            generation: 1,
            len: 0,
            max_side,
        }
    }

    /// Current side of the grid
    pub fn side(&self) -> usize {
        self.side
    }

    fn cell(&self, a: NodeId, b: NodeId) -> Option<usize> {
        let (i, j) = (a.index(), b.index());
        (i < self.side && j < self.side).then(|| i * self.side + j)
    }

    fn grow(&mut self, required: usize) -> Result<()> {
        if let Some(limit) = self.max_side {
            if required > limit {
                return Err(KernelError::CacheCapacityExceeded {
                    requested: required,
                    limit,
                });
            }
        }
        let mut side = (self.side * 2).max(required);
        if let Some(limit) = self.max_side {
            side = side.min(limit);
        }
        trace!("growing dense delta cache from {} to {}", self.side, side);

        let mut values = vec![0.0; side * side];
        let mut stamps = vec![0; side * side];
        for row in 0..self.side {
            let old = row * self.side..(row + 1) * self.side;
            let new = row * side..row * side + self.side;
            values[new.clone()].copy_from_slice(&self.values[old.clone()]);
            stamps[new].copy_from_slice(&self.stamps[old]);
        }
        self.side = side;
        self.values = values;
        self.stamps = stamps;
        Ok(())
    }
}

impl Default for DenseDeltaCache {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaCache for DenseDeltaCache {
    fn get(&self, a: NodeId, b: NodeId) -> f64 {
        match self.cell(a, b) {
            Some(k) if self.stamps[k] == self.generation => self.values[k],
            _ => NOT_COMPUTED,
        }
    }

    fn add(&mut self, a: NodeId, b: NodeId, value: f64) -> Result<()> {
        let k = match self.cell(a, b) {
            Some(k) => k,
            None => {
                self.grow(a.index().max(b.index()) + 1)?;
                a.index() * self.side + b.index()
            }
        };
        if self.stamps[k] != self.generation {
            self.stamps[k] = self.generation;
            self.len += 1;
        }
        self.values[k] = value;
        Ok(())
    }

    fn clear(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.stamps.fill(0);
            self.generation = 1;
        }
        self.len = 0;
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> NodeId {
        NodeId::new(raw)
    }

    #[test]
    fn test_growth_preserves_entries() {
        let mut cache = DenseDeltaCache::with_side(4, None);
        cache.add(id(1), id(2), 0.5).unwrap();
        cache.add(id(3), id(3), 0.75).unwrap();
        assert_eq!(cache.side(), 4);

        cache.add(id(10), id(2), 1.5).unwrap();
        assert!(cache.side() >= 11);
        assert_eq!(cache.get(id(1), id(2)), 0.5);
        assert_eq!(cache.get(id(3), id(3)), 0.75);
        assert_eq!(cache.get(id(10), id(2)), 1.5);
        assert_eq!(cache.get(id(2), id(1)), NOT_COMPUTED);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_growth_doubles() {
        let mut cache = DenseDeltaCache::with_side(8, None);
        cache.add(id(8), id(0), 1.0).unwrap();
        assert_eq!(cache.side(), 16);
    }

    #[test]
    fn test_hard_limit() {
        let mut cache = DenseDeltaCache::with_limit(Some(16));
        cache.add(id(15), id(15), 1.0).unwrap();
        let err = cache.add(id(16), id(1), 1.0).unwrap_err();
        assert_eq!(
            err,
            KernelError::CacheCapacityExceeded {
                requested: 17,
                limit: 16
            }
        );
        assert_eq!(cache.get(id(15), id(15)), 1.0);
    }

    #[test]
    fn test_out_of_range_read_is_unseen() {
        let cache = DenseDeltaCache::with_side(2, None);
        assert_eq!(cache.get(id(100), id(100)), NOT_COMPUTED);
    }

    #[test]
    fn test_generation_wrap() {
        let mut cache = DenseDeltaCache::with_side(4, None);
        cache.add(id(1), id(1), 2.0).unwrap();
        cache.generation = u32::MAX;
        cache.add(id(2), id(2), 3.0).unwrap();
        cache.clear();
        assert_eq!(cache.generation, 1);
        assert_eq!(cache.get(id(1), id(1)), NOT_COMPUTED);
        assert_eq!(cache.get(id(2), id(2)), NOT_COMPUTED);
    }
    #[test]
    fn test_limit_refuses_huge_ids_without_allocating() {
        let mut cache = DenseDeltaCache::with_limit(Some(4096));
        let err = cache.add(id(100_000), id(100_000), 1.0).unwrap_err();
        assert_eq!(
            err,
            KernelError::CacheCapacityExceeded {
                requested: 100_001,
                limit: 4096
            }
        );
        assert_eq!(cache.side(), 64);
        assert!(cache.is_empty());
    }
}
