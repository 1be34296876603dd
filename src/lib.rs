//! Pairwise-kernel decoupled sums
//!
//! Umbrella crate re-exporting the workspace:
//!
//! - [`decoupled_core`] - errors, pairing modes, execution engines, cancellation
//! - [`decoupled_sum`] - the aggregator, the batch runner and the kernel capability
//!
//! # Example
//!
//! ```rust
//! use decoupled_stats::prelude::*;
//!
//! let x = [1.0, 2.0, 3.0];
//! let resamples = vec![vec![10.0, 20.0, 30.0], vec![1.0, 1.0, 1.0]];
//! let add = |a: &f64, b: &f64| a + b;
//!
//! let out = BatchRunner::new(auto_engine())
//!     .with_mode(Mode::Symmetric)
//!     .aggregate_batch(&x, &resamples, &add)
//!     .unwrap();
//! assert_eq!(out[0], 28.0);
//! ```

pub use decoupled_core;
pub use decoupled_sum;

pub use decoupled_core::{CancellationToken, Error, Mode, Result};
pub use decoupled_sum::{
    aggregate, aggregate_batch, aggregate_batch_partial, auto_aggregate_batch, AggregatorConfig,
    BatchRunner, FallibleKernel, Kernel, PairSummary, PairwiseAggregator, PartialBatchResult,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use decoupled_core::prelude::*;
    pub use decoupled_sum::{
        aggregate, aggregate_batch, AggregatorConfig, BatchRunner, FallibleKernel, Kernel,
        PairwiseAggregator, PartialBatchResult,
    };
}
