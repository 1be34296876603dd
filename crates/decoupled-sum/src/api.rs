//! High-level API for decoupled sums
//!
//! Free functions for the common cases. They run on the current thread and
//! are bit-reproducible; build a [`PairwiseAggregator`] or [`BatchRunner`]
//! directly for parallel engines, cancellation or custom chunking.

use crate::{BatchRunner, Kernel, PairwiseAggregator, PartialBatchResult};
use decoupled_core::{HierarchicalExecution, Mode, Result};

/// Mean of `kernel(x[i], y[j])` over the pairs selected by `mode`
///
/// # Example
/// ```rust
/// use decoupled_sum::{aggregate, Mode};
///
/// let x = [1.0, 2.0, 3.0];
/// let y = [10.0, 20.0, 30.0];
/// let add = |a: &f64, b: &f64| a + b;
///
/// assert_eq!(aggregate(&x, &y, &add, Mode::Symmetric).unwrap(), 28.0);
/// assert_eq!(aggregate(&x, &y, &add, Mode::Asymmetric).unwrap(), 22.0);
/// assert!(aggregate(&x[..1], &y[..1], &add, Mode::Symmetric).is_err());
/// ```
pub fn aggregate<T, K>(x: &[T], y: &[T], kernel: &K, mode: Mode) -> Result<f64>
where
    T: Sync,
    K: Kernel<T> + Sync,
{
    PairwiseAggregator::sequential()
        .with_mode(mode)
        .aggregate(x, y, kernel)
}

/// One mean per right collection in `ys`, fail-fast
///
/// # Example
/// ```rust
/// use decoupled_sum::{aggregate_batch, Mode};
///
/// let x = [1.0, 2.0, 3.0];
/// let ys = vec![vec![10.0, 20.0, 30.0], vec![1.0, 1.0, 1.0]];
/// let add = |a: &f64, b: &f64| a + b;
///
/// let out = aggregate_batch(&x, &ys, &add, Mode::Symmetric).unwrap();
/// assert_eq!(out.len(), 2);
/// assert_eq!(out[0], 28.0);
/// ```
pub fn aggregate_batch<T, Y, K>(x: &[T], ys: &[Y], kernel: &K, mode: Mode) -> Result<Vec<f64>>
where
    T: Sync,
    Y: AsRef<[T]> + Sync,
    K: Kernel<T> + Sync,
{
    BatchRunner::sequential()
        .with_mode(mode)
        .aggregate_batch(x, ys, kernel)
}

/// One entry per right collection in `ys`, failures recorded in place
pub fn aggregate_batch_partial<T, Y, K>(
    x: &[T],
    ys: &[Y],
    kernel: &K,
    mode: Mode,
) -> Result<PartialBatchResult>
where
    T: Sync,
    Y: AsRef<[T]> + Sync,
    K: Kernel<T> + Sync,
{
    BatchRunner::sequential()
        .with_mode(mode)
        .aggregate_batch_partial(x, ys, kernel)
}

/// Fail-fast batch on a caller-chosen hierarchical engine
///
/// # Example
/// ```rust,ignore
/// use decoupled_sum::{api::aggregate_batch_with, Mode};
/// use decoupled_core::parallel_no_nested;
///
/// let out = aggregate_batch_with(parallel_no_nested(), &x, &resamples, &kernel, Mode::Symmetric)?;
/// ```
pub fn aggregate_batch_with<E, T, Y, K>(
    engine: E,
    x: &[T],
    ys: &[Y],
    kernel: &K,
    mode: Mode,
) -> Result<Vec<f64>>
where
    E: HierarchicalExecution,
    T: Sync,
    Y: AsRef<[T]> + Sync,
    K: Kernel<T> + Sync,
{
    BatchRunner::new(engine)
        .with_mode(mode)
        .aggregate_batch(x, ys, kernel)
}

/// Fail-fast batch on the auto-selected engine
///
/// Parallel across elements when the `parallel` feature is on. If the budget
/// leaves more than one inner thread, each element's sum is chunked in
/// parallel too and agrees with [`aggregate_batch`] only within rounding.
pub fn auto_aggregate_batch<T, Y, K>(
    x: &[T],
    ys: &[Y],
    kernel: &K,
    mode: Mode,
) -> Result<Vec<f64>>
where
    T: Sync,
    Y: AsRef<[T]> + Sync,
    K: Kernel<T> + Sync,
{
    aggregate_batch_with(decoupled_core::auto_engine(), x, ys, kernel, mode)
}
