//! Recursion-depth-indexed scratch space for the partial tree kernels.
//!
//! The gap-weighted child-subsequence score needs three `(n+1) × (m+1)`
//! matrices and a per-length accumulator for every pair of child lists it visits. The
//! score recurses into the delta function, which may start another score one
//! level deeper, so each depth owns one frame. Within a single evaluation the
//! recursion is depth-first and never has two live frames at the same depth.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::tree::NodeId;

/// Hard caps on the scratch space a single evaluation may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecursionLimits {
    /// Maximum nesting of child-subsequence scores
    pub max_depth: usize,
    /// Maximum number of children of a node taking part in a score
    pub max_children: usize,
}

impl RecursionLimits {
    /// Default limits: depth 40, 100 children
    pub fn new() -> Self {
        Self {
            max_depth: 40,
            max_children: 100,
        }
    }

    /// Set the depth cap
    pub fn with_max_depth(mut self, max_depth: usize) -> Result<Self> {
        if max_depth == 0 {
            return Err(KernelError::invalid_parameter(
                "max_depth",
                max_depth,
                "must be at least 1",
            ));
        }
        self.max_depth = max_depth;
        Ok(self)
    }

    /// Set the fan-out cap
    pub fn with_max_children(mut self, max_children: usize) -> Result<Self> {
        if max_children == 0 {
            return Err(KernelError::invalid_parameter(
                "max_children",
                max_children,
                "must be at least 1",
            ));
        }
        self.max_children = max_children;
        Ok(self)
    }

    /// Re-check limits obtained without the builder (e.g. deserialized)
    pub fn validate(&self) -> Result<()> {
        Self::new()
            .with_max_depth(self.max_depth)?
            .with_max_children(self.max_children)
            .map(|_| ())
    }
}

impl Default for RecursionLimits {
    fn default() -> Self {
        Self::new()
    }
}

/// Row-major matrix reused across evaluations.
#[derive(Debug, Default)]
pub(crate) struct Grid {
    cols: usize,
    data: Vec<f64>,
}

impl Grid {
    fn reset(&mut self, rows: usize, cols: usize) {
        self.cols = cols;
        self.data.clear();
        self.data.resize(rows * cols, 0.0);
    }

    #[inline]
    pub(crate) fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    #[inline]
    pub(crate) fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.cols + j] = value;
    }
}

/// Scratch for one child-subsequence score.
#[derive(Debug, Default)]
pub(crate) struct ScratchFrame {
    pub(crate) deltas: Grid,
    pub(crate) dps: Grid,
    pub(crate) dp: Grid,
    pub(crate) kernel_mat: Vec<f64>,
}

impl ScratchFrame {
    fn reset(&mut self, n: usize, m: usize) {
        self.deltas.reset(n + 1, m + 1);
        self.dps.reset(n + 1, m + 1);
        self.dp.reset(n + 1, m + 1);
        self.kernel_mat.clear();
        self.kernel_mat.resize(n.min(m), 0.0);
    }
}

/// One frame per recursion depth.
#[derive(Debug, Default)]
pub(crate) struct ScratchBuffers {
    limits: RecursionLimits,
    frames: Vec<ScratchFrame>,
    depth: usize,
}

impl ScratchBuffers {
    pub(crate) fn new(limits: RecursionLimits) -> Self {
        Self {
            limits,
            frames: Vec::new(),
            depth: 0,
        }
    }

    pub(crate) fn limits(&self) -> RecursionLimits {
        self.limits
    }

    pub(crate) fn set_limits(&mut self, limits: RecursionLimits) {
        self.limits = limits;
    }

    /// Start of an evaluation; an evaluation that failed midway may have left
    /// frames checked out.
    pub(crate) fn reset(&mut self) {
        self.depth = 0;
    }

    /// Check out the frame for the next depth, sized for `n × m` children.
    pub(crate) fn enter(
        &mut self,
        a: NodeId,
        n: usize,
        b: NodeId,
        m: usize,
    ) -> Result<ScratchFrame> {
        let limit = self.limits.max_children;
        for (node, children) in [(a, n), (b, m)] {
            if children > limit {
                warn!("node {} has {} children, limit is {}", node, children, limit);
                return Err(KernelError::FanOutExceeded {
                    node,
                    children,
                    limit,
                });
            }
        }
        if self.depth >= self.limits.max_depth {
            warn!("delta recursion reached depth {}", self.depth);
            return Err(KernelError::RecursionDepthExceeded {
                limit: self.limits.max_depth,
            });
        }

        if self.frames.len() <= self.depth {
            self.frames.resize_with(self.depth + 1, ScratchFrame::default);
        }
        let mut frame = std::mem::take(&mut self.frames[self.depth]);
        self.depth += 1;
        frame.reset(n, m);
        Ok(frame)
    }

    /// Return the frame checked out by the matching [`enter`](Self::enter).
    pub(crate) fn leave(&mut self, frame: ScratchFrame) {
        self.depth -= 1;
        self.frames[self.depth] = frame;
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }
}
