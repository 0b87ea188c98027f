//! Error types for tree-kernels.

use thiserror::Error;

use crate::tree::NodeId;

/// Errors that can occur while building trees or evaluating kernels.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    /// Invalid kernel parameter
    #[error("Invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },
    /// A node has more children than the scratch buffers can hold
    #[error("Node {node} has {children} children, exceeding the fan-out limit of {limit}")]
    FanOutExceeded {
        node: NodeId,
        children: usize,
        limit: usize,
    },
    /// The delta recursion went deeper than the scratch buffers allow
    #[error("Delta recursion exceeded the depth limit of {limit}")]
    RecursionDepthExceeded { limit: usize },
    /// A dense delta cache was asked to grow past its hard limit
    #[error("Delta cache needs side {requested}, exceeding the limit of {limit}")]
    CacheCapacityExceeded { requested: usize, limit: usize },
    /// A tree edit addressed a node that does not exist
    #[error("Node {0} does not exist in this tree")]
    UnknownNode(NodeId),
    /// Kernel computation failed
    #[error("Kernel computation error: {0}")]
    ComputationError(String),
}

impl KernelError {
    pub(crate) fn invalid_parameter(
        parameter: &str,
        value: impl ToString,
        reason: &str,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Decay factors (λ, μ) must lie in (0, 1].
    pub(crate) fn check_decay(parameter: &str, value: f64) -> Result<f64> {
        if value > 0.0 && value <= 1.0 {
            Ok(value)
        } else {
            Err(Self::invalid_parameter(parameter, value, "must be in (0, 1]"))
        }
    }
}

/// Result type for kernel operations
pub type Result<T> = std::result::Result<T, KernelError>;
