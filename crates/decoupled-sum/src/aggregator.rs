//! Single decoupled sum over a pair of collections
//!
//! The aggregator walks the outer index `i` in row-chunks. Each chunk visits
//! `kernel(x[i], y[j])` for the inner indices its [`Mode`] allows, ascending.
//!
//! - Sequential engines thread one accumulator through every chunk, so the
//!   floating-point summation order is exactly the enumeration order.
//! - Parallel engines give each chunk its own [`PairSummary`] and merge them
//!   in chunk order. Results agree with the sequential ones within rounding.
//!
//! Either way the first failure in enumeration order is the one reported:
//! chunks after a failed chunk are skipped, chunks before it always run.

use crate::config::AggregatorConfig;
use crate::kernel::Kernel;
use crate::summary::PairSummary;
use decoupled_core::execution::chunk_ranges;
use decoupled_core::{
    CancellationToken, Error, ExecutionEngine, Mode, Result, SequentialEngine,
};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, instrument};

/// Evaluates one decoupled sum with a given engine and configuration
///
/// Holds no state between calls; clone it freely.
///
/// ```rust
/// use decoupled_sum::{Mode, PairwiseAggregator};
///
/// let x = [1.0, 2.0, 3.0];
/// let y = [10.0, 20.0, 30.0];
/// let add = |a: &f64, b: &f64| a + b;
///
/// let aggregator = PairwiseAggregator::sequential();
/// assert_eq!(aggregator.aggregate(&x, &y, &add).unwrap(), 28.0);
///
/// let aggregator = aggregator.with_mode(Mode::Asymmetric);
/// assert_eq!(aggregator.aggregate(&x, &y, &add).unwrap(), 22.0);
/// ```
#[derive(Clone, Debug)]
pub struct PairwiseAggregator<E = SequentialEngine> {
    engine: E,
    config: AggregatorConfig,
    cancellation: Option<CancellationToken>,
}

impl PairwiseAggregator<SequentialEngine> {
    /// Aggregator on the current thread, symmetric mode
    pub fn sequential() -> Self {
        Self::new(SequentialEngine::new())
    }
}

impl<E: ExecutionEngine> PairwiseAggregator<E> {
    /// Create an aggregator with default configuration
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            config: AggregatorConfig::default(),
            cancellation: None,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: AggregatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the pair-enumeration mode
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Set the number of outer-index rows per unit of work
    pub fn with_chunk_rows(mut self, rows: usize) -> Self {
        self.config.chunk_rows = Some(rows);
        self
    }

    /// Fail the pair when the kernel returns NaN or an infinity
    pub fn reject_non_finite(mut self, reject: bool) -> Self {
        self.config.reject_non_finite = reject;
        self
    }

    /// Poll `token` between chunks
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// Mean kernel value over the pairs of `x` and `y` selected by the mode
    ///
    /// # Errors
    /// - [`Error::InvalidInput`] if `x` and `y` differ in length
    /// - [`Error::InsufficientPairs`] if fewer than two items are given
    /// - [`Error::KernelInvocation`] for the first failing pair
    /// - [`Error::Cancelled`] if the token fires
    pub fn aggregate<T, K>(&self, x: &[T], y: &[T], kernel: &K) -> Result<f64>
    where
        T: Sync,
        K: Kernel<T> + Sync,
    {
        let summary = self.summarize(x, y, kernel)?;
        summary
            .mean()
            .ok_or_else(|| Error::insufficient_pairs(self.config.mode, x.len()))
    }

    /// Exact `(sum, count)` behind [`aggregate`](Self::aggregate)
    #[instrument(skip_all, fields(n = x.len(), mode = %self.config.mode))]
    pub fn summarize<T, K>(&self, x: &[T], y: &[T], kernel: &K) -> Result<PairSummary>
    where
        T: Sync,
        K: Kernel<T> + Sync,
    {
        self.config.validate()?;
        if x.len() != y.len() {
            return Err(Error::size_mismatch(x.len(), y.len(), "paired collection"));
        }

        let n = x.len();
        let mode = self.config.mode;
        if mode.pair_count(n) == 0 {
            return Err(Error::insufficient_pairs(mode, n));
        }

        let chunk_rows = self
            .config
            .chunk_rows
            .unwrap_or_else(|| E::chunk_size(n, self.engine.num_threads()));
        debug!(
            kernel = kernel.name(),
            chunk_rows,
            pairs = mode.pair_count(n),
            parallel = self.engine.is_parallel(),
            "planned pair enumeration"
        );

        let summary = if self.engine.is_parallel() {
            self.summarize_chunked(x, y, kernel, chunk_rows)?
        } else {
            self.engine.execute(|| {
                let mut acc = PairSummary::default();
                for rows in chunk_ranges(n, chunk_rows) {
                    self.check_cancelled()?;
                    self.accumulate_rows(x, y, kernel, rows, &mut acc)?;
                }
                Ok::<_, Error>(acc)
            })?
        };

        debug_assert_eq!(summary.count, mode.pair_count(n));
        Ok(summary)
    }

    fn summarize_chunked<T, K>(
        &self,
        x: &[T],
        y: &[T],
        kernel: &K,
        chunk_rows: usize,
    ) -> Result<PairSummary>
    where
        T: Sync,
        K: Kernel<T> + Sync,
    {
        // Lowest chunk start that has failed so far
        let first_failure = AtomicUsize::new(usize::MAX);

        let partials = self.engine.map_ranges(x.len(), chunk_rows, |rows| {
            if rows.start > first_failure.load(Ordering::Relaxed) {
                return None;
            }
            let start = rows.start;
            let mut acc = PairSummary::default();
            let outcome = self
                .check_cancelled()
                .and_then(|()| self.accumulate_rows(x, y, kernel, rows, &mut acc));
            if outcome.is_err() {
                first_failure.fetch_min(start, Ordering::Relaxed);
            }
            Some(outcome.map(|()| acc))
        });

        // Skipped chunks only follow a failed one, which is met first
        let mut total = PairSummary::default();
        for partial in partials.into_iter().flatten() {
            total = total.merge(partial?);
        }
        Ok(total)
    }

    fn accumulate_rows<T, K>(
        &self,
        x: &[T],
        y: &[T],
        kernel: &K,
        rows: Range<usize>,
        acc: &mut PairSummary,
    ) -> Result<()>
    where
        K: Kernel<T>,
    {
        let n = x.len();
        for i in rows {
            for j in self.config.mode.columns(i, n) {
                let value = kernel
                    .evaluate(&x[i], &y[j])
                    .map_err(|source| Error::kernel(i, j, source))?;
                if self.config.reject_non_finite && !value.is_finite() {
                    return Err(Error::non_finite(i, j, value));
                }
                acc.add(value);
            }
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancellation {
            Some(token) => token.check(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::FallibleKernel;
    use std::sync::Mutex;

    const X: [f64; 3] = [1.0, 2.0, 3.0];
    const Y: [f64; 3] = [10.0, 20.0, 30.0];

    fn add(a: &f64, b: &f64) -> f64 {
        a + b
    }

    #[test]
    fn test_symmetric_example() {
        let result = PairwiseAggregator::sequential()
            .aggregate(&X, &Y, &add)
            .unwrap();
        assert_eq!(result, 28.0);
    }

    #[test]
    fn test_asymmetric_example() {
        let aggregator = PairwiseAggregator::sequential().with_mode(Mode::Asymmetric);
        assert_eq!(aggregator.aggregate(&X, &Y, &add).unwrap(), 22.0);

        let summary = aggregator.summarize(&X, &Y, &add).unwrap();
        assert_eq!(summary, PairSummary { sum: 132.0, count: 6 });
    }

    #[test]
    fn test_single_item_is_insufficient() {
        for mode in [Mode::Symmetric, Mode::Asymmetric] {
            let err = PairwiseAggregator::sequential()
                .with_mode(mode)
                .aggregate(&[1.0], &[10.0], &add)
                .unwrap_err();
            assert!(matches!(err, Error::InsufficientPairs { n: 1, .. }));
        }
    }

    #[test]
    fn test_empty_is_insufficient() {
        let empty: [f64; 0] = [];
        let err = PairwiseAggregator::sequential()
            .aggregate(&empty, &empty, &add)
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientPairs { mode: Mode::Symmetric, n: 0 }));
    }

    #[test]
    fn test_insufficient_pairs_never_calls_kernel() {
        let calls = Mutex::new(0usize);
        let counting = |a: &f64, b: &f64| {
            *calls.lock().unwrap() += 1;
            a + b
        };
        let _ = PairwiseAggregator::sequential().aggregate(&[1.0], &[2.0], &counting);
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_length_mismatch() {
        let err = PairwiseAggregator::sequential()
            .aggregate(&X, &Y[..2], &add)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("expected 3, got 2"));
    }

    #[test]
    fn test_kernel_failure_reports_first_pair() {
        let calls = Mutex::new(Vec::new());
        let kernel = FallibleKernel(|a: &f64, b: &f64| {
            calls.lock().unwrap().push((*a, *b));
            if *a == 2.0 {
                anyhow::bail!("row two is poisoned");
            }
            Ok(a + b)
        });

        let err = PairwiseAggregator::sequential()
            .with_mode(Mode::Asymmetric)
            .aggregate(&X, &Y, &kernel)
            .unwrap_err();

        assert_eq!(err.failing_pair(), Some((1, 0)));
        assert!(err.to_string().contains("row two is poisoned"));
        // (0, 1), (0, 2), then the failing (1, 0); nothing after it
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_non_finite_passes_through_by_default() {
        let nan = |_: &f64, _: &f64| f64::NAN;
        let result = PairwiseAggregator::sequential()
            .aggregate(&X, &Y, &nan)
            .unwrap();
        assert!(result.is_nan());
    }

    #[test]
    fn test_non_finite_rejected_when_configured() {
        let inf_on_last = |a: &f64, _: &f64| if *a == 2.0 { f64::INFINITY } else { 1.0 };
        let err = PairwiseAggregator::sequential()
            .reject_non_finite(true)
            .aggregate(&X, &Y, &inf_on_last)
            .unwrap_err();
        assert_eq!(err.failing_pair(), Some((1, 2)));
    }

    #[test]
    fn test_zero_chunk_rows_rejected() {
        let err = PairwiseAggregator::sequential()
            .with_chunk_rows(0)
            .aggregate(&X, &Y, &add)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn test_chunking_does_not_change_sequential_result() {
        let x: Vec<f64> = (0..50).map(|i| (i as f64).sin()).collect();
        let y: Vec<f64> = (0..50).map(|i| (i as f64 * 0.7).cos()).collect();
        let k = |a: &f64, b: &f64| (a - b).abs().sqrt();

        let whole = PairwiseAggregator::sequential()
            .with_chunk_rows(50)
            .aggregate(&x, &y, &k)
            .unwrap();
        for rows in [1, 3, 7, 64] {
            let chunked = PairwiseAggregator::sequential()
                .with_chunk_rows(rows)
                .aggregate(&x, &y, &k)
                .unwrap();
            assert_eq!(whole.to_bits(), chunked.to_bits());
        }
    }

    #[cfg(not(feature = "parallel"))]
    #[test]
    fn test_budgeted_engine_without_rayon_keeps_sequential_bits() {
        use decoupled_core::{budgeted_engine, ParallelismBudget};

        let x: Vec<f64> = (0..50).map(|i| (i as f64).sin()).collect();
        let y: Vec<f64> = (0..50).map(|i| (i as f64 * 0.7).cos()).collect();
        let k = |a: &f64, b: &f64| (a - b).abs().sqrt();

        let reference = PairwiseAggregator::sequential()
            .aggregate(&x, &y, &k)
            .unwrap();
        let budgeted = PairwiseAggregator::new(budgeted_engine(ParallelismBudget::custom(2, 2)))
            .with_chunk_rows(3)
            .aggregate(&x, &y, &k)
            .unwrap();
        assert_eq!(reference.to_bits(), budgeted.to_bits());
    }

    #[test]
    fn test_cancelled_token() {
        let token = CancellationToken::new();
        token.cancel();
        let err = PairwiseAggregator::sequential()
            .with_cancellation(token)
            .aggregate(&X, &Y, &add)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_cancel_between_chunks() {
        let token = CancellationToken::new();
        let calls = Mutex::new(0usize);
        let kernel = |a: &f64, b: &f64| {
            let mut c = calls.lock().unwrap();
            *c += 1;
            if *c == 1 {
                token.cancel();
            }
            a + b
        };

        let err = PairwiseAggregator::sequential()
            .with_chunk_rows(1)
            .with_cancellation(token.clone())
            .aggregate(&X, &Y, &kernel)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        // The first row runs to completion: (0, 1) and (0, 2)
        assert_eq!(*calls.lock().unwrap(), 2);
    }
}
