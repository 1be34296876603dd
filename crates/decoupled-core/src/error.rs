//! Error types for decoupled pairwise-kernel sums
//!
//! Provides a unified error type for all decoupled-stats crates.

use crate::mode::Mode;
use thiserror::Error;

/// Core error type for pairwise aggregation
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter provided to a function
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The mode and input length yield zero index pairs
    #[error("Insufficient pairs: {mode} mode over {n} items yields no index pairs")]
    InsufficientPairs { mode: Mode, n: usize },

    /// The kernel failed while scoring pair `(i, j)`
    #[error("Kernel invocation failed at pair ({i}, {j}): {source}")]
    KernelInvocation {
        i: usize,
        j: usize,
        #[source]
        source: anyhow::Error,
    },

    /// A batch element failed; wraps the element's own error
    #[error("Batch element {index} failed: {source}")]
    BatchElementFailure {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    /// The cancellation token fired or its deadline passed
    #[error("Computation cancelled")]
    Cancelled,

    /// Threading or parallelization error
    #[error("Execution error: {0}")]
    Execution(String),

    /// Malformed configuration document
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for left/right collections of different lengths
    pub fn size_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::InvalidInput(format!(
            "Size mismatch in {context}: expected {expected}, got {actual}"
        ))
    }

    /// Create an error for a degenerate pair set
    pub fn insufficient_pairs(mode: Mode, n: usize) -> Self {
        Self::InsufficientPairs { mode, n }
    }

    /// Create an error for a kernel failure at `(i, j)`
    pub fn kernel(i: usize, j: usize, source: impl Into<anyhow::Error>) -> Self {
        Self::KernelInvocation {
            i,
            j,
            source: source.into(),
        }
    }

    /// Create an error for a non-finite kernel value at `(i, j)`
    pub fn non_finite(i: usize, j: usize, value: f64) -> Self {
        Self::kernel(i, j, anyhow::anyhow!("kernel returned non-finite value {value}"))
    }

    /// Wrap an error with the batch index it came from
    pub fn at_batch_index(self, index: usize) -> Self {
        Self::BatchElementFailure {
            index,
            source: Box::new(self),
        }
    }

    /// The failing `(i, j)` pair, looking through batch wrappers
    pub fn failing_pair(&self) -> Option<(usize, usize)> {
        match self {
            Self::KernelInvocation { i, j, .. } => Some((*i, *j)),
            Self::BatchElementFailure { source, .. } => source.failing_pair(),
            _ => None,
        }
    }

    /// The failing batch index, if this error came out of a batch
    pub fn batch_index(&self) -> Option<usize> {
        match self {
            Self::BatchElementFailure { index, .. } => Some(*index),
            _ => None,
        }
    }
}
