//! Batched decoupled sums
//!
//! A batch pairs one fixed left collection with many right collections (for
//! example bootstrap resamples) and produces one mean per right collection.
//! Output position `b` always belongs to input position `b`.
//!
//! Elements run on the outer engine; each element's own sum runs on a
//! subordinate engine so nested parallelism stays within budget.

use crate::aggregator::PairwiseAggregator;
use crate::config::AggregatorConfig;
use crate::kernel::Kernel;
use decoupled_core::{
    CancellationToken, Error, HierarchicalExecution, Mode, Result, SequentialEngine,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, instrument, warn};

/// Repeats a [`PairwiseAggregator`] across a batch of right collections
///
/// Two failure policies are offered as separate operations:
///
/// - [`aggregate_batch`](Self::aggregate_batch) fails fast: the first failing
///   element aborts the call with [`Error::BatchElementFailure`].
/// - [`aggregate_batch_partial`](Self::aggregate_batch_partial) records each
///   element's value or error and always returns all entries.
#[derive(Clone, Debug)]
pub struct BatchRunner<E = SequentialEngine> {
    engine: E,
    config: AggregatorConfig,
    cancellation: Option<CancellationToken>,
    inner_threads: Option<usize>,
}

impl BatchRunner<SequentialEngine> {
    /// Runner on the current thread, symmetric mode
    pub fn sequential() -> Self {
        Self::new(SequentialEngine::new())
    }
}

impl<E: HierarchicalExecution> BatchRunner<E> {
    /// Create a runner with default configuration
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            config: AggregatorConfig::default(),
            cancellation: None,
            inner_threads: None,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: AggregatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the pair-enumeration mode shared by every element
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Poll `token` before each element and between each element's chunks
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Cap the threads each element's own sum may use
    ///
    /// The cap never exceeds the engine's inner budget; `1` or `0` runs every
    /// element sequentially.
    pub fn with_inner_threads(mut self, max_threads: usize) -> Self {
        self.inner_threads = Some(max_threads);
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// The aggregator each element runs with
    pub fn element_aggregator(&self) -> PairwiseAggregator<E::SubordinateEngine> {
        let engine = match self.inner_threads {
            Some(max_threads) => self.engine.subordinate_with_threads(max_threads),
            None => self.engine.subordinate(),
        };
        let aggregator = PairwiseAggregator::new(engine).with_config(self.config.clone());
        match &self.cancellation {
            Some(token) => aggregator.with_cancellation(token.clone()),
            None => aggregator,
        }
    }

    /// One mean per right collection, fail-fast
    ///
    /// `output[b]` equals `aggregate(x, ys[b])`. The call fails with
    /// [`Error::BatchElementFailure`] carrying the lowest failing index;
    /// elements after a known failure are skipped. Cancellation surfaces as
    /// [`Error::Cancelled`] without a batch index.
    #[instrument(skip_all, fields(n = x.len(), batch = ys.len(), mode = %self.config.mode))]
    pub fn aggregate_batch<T, Y, K>(&self, x: &[T], ys: &[Y], kernel: &K) -> Result<Vec<f64>>
    where
        T: Sync,
        Y: AsRef<[T]> + Sync,
        K: Kernel<T> + Sync,
    {
        self.config.validate()?;
        let aggregator = self.element_aggregator();
        let first_failure = AtomicUsize::new(usize::MAX);

        let outcomes = self.engine.execute_batch(ys.len(), |b| {
            if b > first_failure.load(Ordering::Relaxed) {
                return None;
            }
            let outcome = self.run_element(&aggregator, x, ys[b].as_ref(), kernel);
            if outcome.is_err() {
                first_failure.fetch_min(b, Ordering::Relaxed);
            }
            Some(outcome)
        });

        let mut values = Vec::with_capacity(ys.len());
        for (b, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Some(Ok(value)) => values.push(value),
                Some(Err(Error::Cancelled)) => return Err(Error::Cancelled),
                Some(Err(e)) => return Err(e.at_batch_index(b)),
                None => {
                    return Err(Error::Execution(format!(
                        "batch element {b} skipped without a preceding failure"
                    )))
                }
            }
        }

        debug!(elements = values.len(), "batch complete");
        Ok(values)
    }

    /// One entry per right collection, failures recorded in place
    ///
    /// Element errors are wrapped in [`Error::BatchElementFailure`] and kept
    /// at their index. Only cancellation or an invalid configuration fails the
    /// call as a whole.
    #[instrument(skip_all, fields(n = x.len(), batch = ys.len(), mode = %self.config.mode))]
    pub fn aggregate_batch_partial<T, Y, K>(
        &self,
        x: &[T],
        ys: &[Y],
        kernel: &K,
    ) -> Result<PartialBatchResult>
    where
        T: Sync,
        Y: AsRef<[T]> + Sync,
        K: Kernel<T> + Sync,
    {
        self.config.validate()?;
        let aggregator = self.element_aggregator();

        let outcomes = self.engine.execute_batch(ys.len(), |b| {
            self.run_element(&aggregator, x, ys[b].as_ref(), kernel)
        });

        let mut entries = Vec::with_capacity(outcomes.len());
        for (b, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(value) => entries.push(Ok(value)),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    warn!(index = b, error = %e, "batch element failed");
                    entries.push(Err(e.at_batch_index(b)));
                }
            }
        }

        let result = PartialBatchResult { entries };
        debug!(
            elements = result.len(),
            failures = result.failure_count(),
            "partial batch complete"
        );
        Ok(result)
    }

    fn run_element<T, K, S>(
        &self,
        aggregator: &PairwiseAggregator<S>,
        x: &[T],
        y: &[T],
        kernel: &K,
    ) -> Result<f64>
    where
        T: Sync,
        K: Kernel<T> + Sync,
        S: decoupled_core::ExecutionEngine,
    {
        if let Some(token) = &self.cancellation {
            token.check()?;
        }
        aggregator.aggregate(x, y, kernel)
    }
}

/// Per-element outcomes of [`BatchRunner::aggregate_batch_partial`]
///
/// Entry `b` is either the mean for input `b` or the
/// [`Error::BatchElementFailure`] for index `b`.
#[derive(Debug)]
pub struct PartialBatchResult {
    entries: Vec<Result<f64>>,
}

impl PartialBatchResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every element produced a value
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.is_ok())
    }

    pub fn failure_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_err()).count()
    }

    pub fn entries(&self) -> &[Result<f64>] {
        &self.entries
    }

    /// Values with failed elements as `None`, index-aligned with the input
    pub fn values(&self) -> Vec<Option<f64>> {
        self.entries.iter().map(|e| e.as_ref().ok().copied()).collect()
    }

    /// `(index, error)` for each failed element, ascending
    pub fn failures(&self) -> impl Iterator<Item = (usize, &Error)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(b, e)| e.as_ref().err().map(|err| (b, err)))
    }

    /// All values, or the error of the lowest failed element
    pub fn into_values(self) -> Result<Vec<f64>> {
        self.entries.into_iter().collect()
    }

    pub fn into_entries(self) -> Vec<Result<f64>> {
        self.entries
    }
}
