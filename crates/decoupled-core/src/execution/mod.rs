//! Execution engines for controlling computation strategy
//!
//! This module provides the execution engine abstraction that decides whether
//! independent units of work (row-chunks of a pair enumeration, or elements
//! of a batch) run sequentially or across a thread pool.
//!
//! # Design Philosophy
//!
//! - **Fork-Join Only**: Engines partition index ranges and collect results in
//!   index order; reduction is left to the caller
//! - **Thread Pool Integration**: Works with the global Rayon pool or a
//!   dedicated one
//! - **Hierarchical Control**: Prevents thread oversubscription in nested
//!   operations (see [`HierarchicalExecution`])

mod hierarchical;

pub use hierarchical::{
    budgeted_engine, BudgetedEngine, BudgetedSubordinate,
    HierarchicalExecution, ParallelismBudget,
};

use std::ops::Range;

#[cfg(feature = "parallel")]
use crate::Result;

/// Rows per chunk for sequential engines; sets how often cancellation is polled
pub const DEFAULT_SEQUENTIAL_CHUNK: usize = 64;

/// Execution strategy for batch operations
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ExecutionStrategy {
    /// Process items sequentially
    Sequential,
    /// Process items in parallel
    Parallel,
}

/// Marker trait for execution engine mode properties
pub trait ExecutionMode {
    /// Optimal chunk size for this execution mode
    fn chunk_size(n_items: usize, n_threads: usize) -> usize;
}

/// Trait for execution engines that control how computations are performed
pub trait ExecutionEngine: Clone + Send + Sync + ExecutionMode {
    /// Execute a function in the engine's execution context
    fn execute<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send;

    /// Split `0..len` into consecutive ranges of `chunk_size` and map `f` over
    /// them; results come back in range order
    fn map_ranges<F, R>(&self, len: usize, chunk_size: usize, f: F) -> Vec<R>
    where
        F: Fn(Range<usize>) -> R + Sync + Send,
        R: Send;

    /// Execute `f(0) .. f(count - 1)`; results come back in index order
    fn execute_batch<F, R>(&self, count: usize, f: F) -> Vec<R>
    where
        F: Fn(usize) -> R + Sync + Send,
        R: Send;

    /// Get the execution strategy
    fn strategy(&self) -> ExecutionStrategy;

    /// Check if parallel execution is available
    fn is_parallel(&self) -> bool {
        self.strategy() == ExecutionStrategy::Parallel
    }

    /// Get the number of threads available
    fn num_threads(&self) -> usize;
}

/// Ranges `[k * chunk_size, min((k + 1) * chunk_size, len))` covering `0..len`
pub fn chunk_ranges(len: usize, chunk_size: usize) -> impl Iterator<Item = Range<usize>> {
    let chunk_size = chunk_size.max(1);
    (0..len.div_ceil(chunk_size)).map(move |k| {
        let start = k * chunk_size;
        start..(start + chunk_size).min(len)
    })
}

/// Sequential execution engine
///
/// Executes all operations sequentially in the current thread.
#[derive(Clone, Debug, Default)]
pub struct SequentialEngine;

impl SequentialEngine {
    /// Create a new sequential engine
    pub fn new() -> Self {
        Self
    }
}

impl ExecutionMode for SequentialEngine {
    fn chunk_size(n_items: usize, _n_threads: usize) -> usize {
        n_items.clamp(1, DEFAULT_SEQUENTIAL_CHUNK)
    }
}

impl ExecutionEngine for SequentialEngine {
    fn execute<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        f()
    }

    fn map_ranges<F, R>(&self, len: usize, chunk_size: usize, f: F) -> Vec<R>
    where
        F: Fn(Range<usize>) -> R + Sync + Send,
        R: Send,
    {
        chunk_ranges(len, chunk_size).map(f).collect()
    }

    fn execute_batch<F, R>(&self, count: usize, f: F) -> Vec<R>
    where
        F: Fn(usize) -> R + Sync + Send,
        R: Send,
    {
        (0..count).map(f).collect()
    }

    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::Sequential
    }

    fn num_threads(&self) -> usize {
        1
    }
}

/// Parallel execution engine using Rayon
///
/// Executes operations in parallel using Rayon's thread pool.
#[cfg(feature = "parallel")]
#[derive(Clone, Debug, Default)]
pub struct ParallelEngine {
    thread_pool: Option<std::sync::Arc<rayon::ThreadPool>>,
}

#[cfg(feature = "parallel")]
impl ParallelEngine {
    /// Create a new parallel engine with default thread pool
    pub fn new() -> Self {
        Self { thread_pool: None }
    }

    /// Create a new parallel engine on a caller-built thread pool
    ///
    /// The pool can be shared with other engines or with the caller's own
    /// rayon work.
    pub fn with_thread_pool(pool: std::sync::Arc<rayon::ThreadPool>) -> Self {
        Self {
            thread_pool: Some(pool),
        }
    }

    /// Create with a specific number of threads
    pub fn with_num_threads(num_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| crate::Error::Execution(format!("Failed to create thread pool: {e}")))?;
        log::debug!("built dedicated pool with {} threads", pool.current_num_threads());

        Ok(Self {
            thread_pool: Some(std::sync::Arc::new(pool)),
        })
    }

    fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.thread_pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }
}

#[cfg(feature = "parallel")]
impl ExecutionMode for ParallelEngine {
    fn chunk_size(n_items: usize, n_threads: usize) -> usize {
        let target_chunks = n_threads.max(1) * 6;
        let chunk_size = n_items.div_ceil(target_chunks);
        chunk_size.max(4).min(n_items).max(1)
    }
}

#[cfg(feature = "parallel")]
impl ExecutionEngine for ParallelEngine {
    fn execute<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.thread_pool {
            Some(pool) => pool.install(f),
            None => rayon::scope(|_| f()),
        }
    }

    fn map_ranges<F, R>(&self, len: usize, chunk_size: usize, f: F) -> Vec<R>
    where
        F: Fn(Range<usize>) -> R + Sync + Send,
        R: Send,
    {
        use rayon::prelude::*;

        let ranges: Vec<Range<usize>> = chunk_ranges(len, chunk_size).collect();
        self.install(|| ranges.into_par_iter().map(f).collect())
    }

    fn execute_batch<F, R>(&self, count: usize, f: F) -> Vec<R>
    where
        F: Fn(usize) -> R + Sync + Send,
        R: Send,
    {
        use rayon::prelude::*;

        self.install(|| (0..count).into_par_iter().map(f).collect())
    }

    fn strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::Parallel
    }

    fn num_threads(&self) -> usize {
        match &self.thread_pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

/// Create a sequential engine
pub fn sequential() -> SequentialEngine {
    SequentialEngine::new()
}

/// Create a parallel engine on the global Rayon pool
#[cfg(feature = "parallel")]
pub fn parallel() -> ParallelEngine {
    ParallelEngine::new()
}

/// Create an auto-selected engine based on available features
///
/// This uses the hierarchical execution system with automatic parallelism budgeting,
/// which prevents thread oversubscription in nested parallel operations.
pub fn auto_engine() -> impl HierarchicalExecution {
    #[cfg(feature = "parallel")]
    {
        budgeted_engine(ParallelismBudget::auto())
    }
    #[cfg(not(feature = "parallel"))]
    {
        sequential()
    }
}

/// Create a parallel engine that prevents nested parallelism
///
/// Batch runs use this so each per-element sum runs sequentially inside its
/// worker.
#[cfg(feature = "parallel")]
pub fn parallel_no_nested() -> BudgetedEngine {
    budgeted_engine(ParallelismBudget::no_nested())
}

/// Create a parallel engine with custom thread distribution
///
/// # Arguments
/// * `outer_threads` - Threads for outer parallel operations
/// * `inner_threads` - Threads available for nested operations
#[cfg(feature = "parallel")]
pub fn parallel_with_budget(outer_threads: usize, inner_threads: usize) -> BudgetedEngine {
    budgeted_engine(ParallelismBudget::custom(outer_threads, inner_threads))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_ranges() {
        let ranges: Vec<_> = chunk_ranges(10, 4).collect();
        assert_eq!(ranges, vec![0..4, 4..8, 8..10]);

        assert_eq!(chunk_ranges(0, 4).count(), 0);
        // Zero chunk size is clamped rather than looping forever
        assert_eq!(chunk_ranges(3, 0).count(), 3);
    }

    #[test]
    fn test_sequential_engine() {
        let engine = sequential();

        let result = engine.execute(|| 42);
        assert_eq!(result, 42);

        let sums = engine.map_ranges(6, 2, |r| r.sum::<usize>());
        assert_eq!(sums, vec![1, 5, 9]);

        let squares = engine.execute_batch(5, |i| i * i);
        assert_eq!(squares, vec![0, 1, 4, 9, 16]);

        assert_eq!(engine.strategy(), ExecutionStrategy::Sequential);
        assert!(!engine.is_parallel());
        assert_eq!(engine.num_threads(), 1);
    }

    #[test]
    fn test_sequential_chunk_size() {
        assert_eq!(SequentialEngine::chunk_size(10, 1), 10);
        assert_eq!(SequentialEngine::chunk_size(1000, 1), DEFAULT_SEQUENTIAL_CHUNK);
        assert_eq!(SequentialEngine::chunk_size(0, 1), 1);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_engine() {
        let engine = parallel();

        let data: Vec<i32> = (0..1000).collect();
        let sum = engine.execute(|| {
            use rayon::prelude::*;
            data.par_iter().sum::<i32>()
        });
        assert_eq!(sum, 499500);

        let sums = engine.map_ranges(100, 25, |r| r.len());
        assert_eq!(sums, vec![25, 25, 25, 25]);

        let ids = engine.execute_batch(64, |i| i);
        assert_eq!(ids, (0..64).collect::<Vec<_>>());

        assert_eq!(engine.strategy(), ExecutionStrategy::Parallel);
        assert!(engine.num_threads() > 0);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_dedicated_pool() {
        let engine = ParallelEngine::with_num_threads(2).unwrap();
        assert_eq!(engine.num_threads(), 2);
        assert_eq!(engine.execute_batch(3, |i| i + 1), vec![1, 2, 3]);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_shared_pool() {
        let pool = std::sync::Arc::new(
            rayon::ThreadPoolBuilder::new().num_threads(3).build().unwrap(),
        );
        let engine = ParallelEngine::with_thread_pool(pool.clone());
        let sibling = engine.clone();

        assert_eq!(engine.num_threads(), 3);
        assert_eq!(sibling.num_threads(), 3);
        assert!(engine.is_parallel());

        let in_pool = engine.execute_batch(4, |_| rayon::current_thread_index().is_some());
        assert_eq!(in_pool, vec![true; 4]);
    }

    #[test]
    fn test_auto_engine() {
        let engine = auto_engine();
        assert!(engine.num_threads() > 0);
    }
}
