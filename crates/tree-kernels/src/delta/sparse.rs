use std::collections::HashMap;

use super::DeltaCache;
use crate::error::Result;
use crate::tree::NodeId;

/// Row id → (column id → value). Absent pairs read as `0.0`.
#[derive(Debug, Clone, Default)]
pub struct SparseDeltaCache {
    rows: HashMap<NodeId, HashMap<NodeId, f64>>,
    len: usize,
}

impl SparseDeltaCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeltaCache for SparseDeltaCache {
    fn get(&self, a: NodeId, b: NodeId) -> f64 {
        self.rows
            .get(&a)
            .and_then(|row| row.get(&b))
            .copied()
            .unwrap_or(0.0)
    }

    fn add(&mut self, a: NodeId, b: NodeId, value: f64) -> Result<()> {
        if self.rows.entry(a).or_default().insert(b, value).is_none() {
            self.len += 1;
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.len = 0;
    }

    fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::NOT_COMPUTED;

    #[test]
    fn test_absent_reads_zero() {
        let mut cache = SparseDeltaCache::new();
        assert_eq!(cache.get(NodeId::new(1), NodeId::new(1)), 0.0);
        cache.add(NodeId::new(1), NodeId::new(2), 0.3).unwrap();
        // row present, column absent
        assert_eq!(cache.get(NodeId::new(1), NodeId::new(3)), 0.0);
        assert_eq!(cache.lookup(NodeId::new(1), NodeId::new(3)), Some(0.0));
    }

    #[test]
    fn test_overwrite_keeps_len() {
        let mut cache = SparseDeltaCache::new();
        cache.add(NodeId::new(7), NodeId::new(9), NOT_COMPUTED).unwrap();
        cache.add(NodeId::new(7), NodeId::new(9), 0.1).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(NodeId::new(7), NodeId::new(9)), 0.1);
    }

    #[test]
    fn test_large_ids() {
        let mut cache = SparseDeltaCache::new();
        cache
            .add(NodeId::new(1_000_000), NodeId::new(2_000_000), 2.0)
            .unwrap();
        assert_eq!(cache.get(NodeId::new(1_000_000), NodeId::new(2_000_000)), 2.0);
    }
}
