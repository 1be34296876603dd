//! Decoupled pairwise-kernel sums
//!
//! A decoupled sum is the mean of a caller-supplied kernel over index pairs
//! of two equal-length collections `x` and `y`:
//!
//! - **Symmetric** mode visits `kernel(x[i], y[j])` for `i < j`
//! - **Asymmetric** mode visits it for every `i != j`
//!
//! Batches repeat the sum for one `x` against many `y`s (for example
//! bootstrap resamples) and return one value per `y`, in input order.
//!
//! # Overview
//!
//! - [`PairwiseAggregator`] evaluates one sum on any execution engine
//! - [`BatchRunner`] runs many sums with hierarchical parallelism, fail-fast
//!   or with per-element failures recorded
//! - [`Kernel`] is the capability being averaged; closures qualify
//! - [`api`] has free functions for the sequential common case
//!
//! Every call does `O(n^2)` kernel evaluations; nothing is memoized.
//!
//! # Examples
//!
//! ```rust
//! use decoupled_sum::{aggregate, aggregate_batch, Error, Mode};
//!
//! let x = [1.0, 2.0, 3.0];
//! let y = [10.0, 20.0, 30.0];
//! let add = |a: &f64, b: &f64| a + b;
//!
//! assert_eq!(aggregate(&x, &y, &add, Mode::Symmetric).unwrap(), 28.0);
//!
//! let out = aggregate_batch(&x, &[y.to_vec(), vec![1.0; 3]], &add, Mode::Symmetric).unwrap();
//! assert_eq!(out.len(), 2);
//!
//! let degenerate = aggregate(&x[..1], &y[..1], &add, Mode::Asymmetric);
//! assert!(matches!(degenerate, Err(Error::InsufficientPairs { n: 1, .. })));
//! ```
//!
//! ## Parallel batches
//!
//! ```rust,ignore
//! use decoupled_sum::BatchRunner;
//! use decoupled_core::parallel_no_nested;
//!
//! let runner = BatchRunner::new(parallel_no_nested()).with_mode(Mode::Asymmetric);
//! let report = runner.aggregate_batch_partial(&x, &resamples, &kernel)?;
//! for (b, err) in report.failures() {
//!     eprintln!("resample {b}: {err}");
//! }
//! ```

pub mod aggregator;
pub mod api;
pub mod batch;
pub mod config;
pub mod kernel;
pub mod summary;

// Re-exports
pub use aggregator::PairwiseAggregator;
pub use api::{aggregate, aggregate_batch, aggregate_batch_partial, auto_aggregate_batch};
pub use batch::{BatchRunner, PartialBatchResult};
pub use config::AggregatorConfig;
pub use kernel::{FallibleKernel, Kernel};
pub use summary::PairSummary;

pub use decoupled_core::{CancellationToken, Error, Mode, Result};
