//! Hierarchical execution control for nested parallel operations
//!
//! A batch of decoupled sums is parallel twice over: across batch elements
//! and across the row-chunks of each sum. This module lets the outer loop
//! hand its workers a subordinate engine with a constrained thread budget.

#[cfg(feature = "parallel")]
use super::ParallelEngine;
use super::{chunk_ranges, ExecutionEngine, ExecutionMode, ExecutionStrategy, SequentialEngine};
use std::ops::Range;

/// Extension trait for hierarchical execution control
///
/// This trait allows execution engines to create subordinate engines with
/// constrained parallelism, enabling proper thread management in nested
/// parallel operations.
pub trait HierarchicalExecution: ExecutionEngine {
    /// The type of subordinate engine this engine creates
    type SubordinateEngine: ExecutionEngine;

    /// Create a subordinate engine for nested operations
    ///
    /// The subordinate engine should have reduced or no parallelism to prevent
    /// thread oversubscription when used within already-parallel operations.
    ///
    /// # Example
    /// ```rust,ignore
    /// // Batch runs use parallel execution across elements
    /// let outer_engine = parallel_no_nested();
    ///
    /// // But creates sequential engines for the per-element sums
    /// let inner_engine = outer_engine.subordinate();
    /// ```
    fn subordinate(&self) -> Self::SubordinateEngine;

    /// Create a subordinate engine with specific thread budget
    fn subordinate_with_threads(&self, max_threads: usize) -> Self::SubordinateEngine;
}

/// Parallelism budget for hierarchical execution
///
/// This type represents how available threads should be distributed between
/// outer and inner parallel operations.
#[derive(Debug, Clone, Copy)]
pub struct ParallelismBudget {
    /// Total threads available
    pub total_threads: usize,
    /// Threads reserved for outer operations (e.g., batch elements)
    pub outer_threads: usize,
    /// Threads available for inner operations (e.g., row-chunks)
    pub inner_threads: usize,
}

impl ParallelismBudget {
    fn available_threads() -> usize {
        #[cfg(feature = "parallel")]
        {
            rayon::current_num_threads()
        }
        #[cfg(not(feature = "parallel"))]
        {
            1
        }
    }

    /// Create an automatic budget based on available cores
    pub fn auto() -> Self {
        let total = Self::available_threads();

        // Coarse-grained outer parallelism gets most of the threads
        let outer_threads = (total * 3 / 4).max(1);
        let inner_threads = (total / 4).max(1);

        Self {
            total_threads: total,
            outer_threads,
            inner_threads,
        }
    }

    /// Create a budget that prevents all nested parallelism
    pub fn no_nested() -> Self {
        let total = Self::available_threads();
        Self {
            total_threads: total,
            outer_threads: total,
            inner_threads: 1,
        }
    }

    /// Create a custom budget
    pub fn custom(outer_threads: usize, inner_threads: usize) -> Self {
        Self {
            total_threads: outer_threads + inner_threads,
            outer_threads,
            inner_threads,
        }
    }
}

/// Budgeted execution engine that respects parallelism constraints
#[derive(Clone, Debug)]
pub struct BudgetedEngine {
    budget: ParallelismBudget,
    is_subordinate: bool,
}

impl BudgetedEngine {
    /// Create a new budgeted engine
    pub fn new(budget: ParallelismBudget) -> Self {
        Self {
            budget,
            is_subordinate: false,
        }
    }

    fn new_subordinate(parent_budget: ParallelismBudget) -> Self {
        Self {
            budget: parent_budget,
            is_subordinate: true,
        }
    }

    /// The budget this engine was built with
    pub fn budget(&self) -> ParallelismBudget {
        self.budget
    }
}

impl ExecutionMode for BudgetedEngine {
    fn chunk_size(n_items: usize, n_threads: usize) -> usize {
        let target_chunks = n_threads.max(1) * 6;
        let chunk_size = n_items.div_ceil(target_chunks);
        chunk_size.max(4).min(n_items).max(1)
    }
}

impl ExecutionEngine for BudgetedEngine {
    fn execute<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        #[cfg(feature = "parallel")]
        {
            if self.strategy() == ExecutionStrategy::Parallel {
                rayon::scope(|_| f())
            } else {
                f()
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            f()
        }
    }

    fn map_ranges<F, R>(&self, len: usize, chunk_size: usize, f: F) -> Vec<R>
    where
        F: Fn(Range<usize>) -> R + Sync + Send,
        R: Send,
    {
        #[cfg(feature = "parallel")]
        {
            if self.strategy() == ExecutionStrategy::Parallel {
                use rayon::prelude::*;
                let ranges: Vec<Range<usize>> = chunk_ranges(len, chunk_size).collect();
                return ranges.into_par_iter().map(f).collect();
            }
        }
        chunk_ranges(len, chunk_size).map(f).collect()
    }

    fn execute_batch<F, R>(&self, count: usize, f: F) -> Vec<R>
    where
        F: Fn(usize) -> R + Sync + Send,
        R: Send,
    {
        #[cfg(feature = "parallel")]
        {
            if self.strategy() == ExecutionStrategy::Parallel {
                use rayon::prelude::*;
                return (0..count).into_par_iter().map(f).collect();
            }
        }
        (0..count).map(f).collect()
    }

    fn strategy(&self) -> ExecutionStrategy {
        if cfg!(not(feature = "parallel")) {
            return ExecutionStrategy::Sequential;
        }
        if self.is_subordinate && self.budget.inner_threads <= 1 {
            ExecutionStrategy::Sequential
        } else if self.is_subordinate || self.budget.outer_threads > 1 {
            ExecutionStrategy::Parallel
        } else {
            ExecutionStrategy::Sequential
        }
    }

    fn num_threads(&self) -> usize {
        if self.is_subordinate {
            self.budget.inner_threads
        } else {
            self.budget.outer_threads
        }
    }
}

/// Enum to represent subordinate engines from BudgetedEngine
#[derive(Clone, Debug)]
pub enum BudgetedSubordinate {
    Sequential(SequentialEngine),
    Budgeted(BudgetedEngine),
}

impl ExecutionMode for BudgetedSubordinate {
    fn chunk_size(n_items: usize, n_threads: usize) -> usize {
        BudgetedEngine::chunk_size(n_items, n_threads)
    }
}

impl ExecutionEngine for BudgetedSubordinate {
    fn execute<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match self {
            BudgetedSubordinate::Sequential(e) => e.execute(f),
            BudgetedSubordinate::Budgeted(e) => e.execute(f),
        }
    }

    fn map_ranges<F, R>(&self, len: usize, chunk_size: usize, f: F) -> Vec<R>
    where
        F: Fn(Range<usize>) -> R + Sync + Send,
        R: Send,
    {
        match self {
            BudgetedSubordinate::Sequential(e) => e.map_ranges(len, chunk_size, f),
            BudgetedSubordinate::Budgeted(e) => e.map_ranges(len, chunk_size, f),
        }
    }

    fn execute_batch<F, R>(&self, count: usize, f: F) -> Vec<R>
    where
        F: Fn(usize) -> R + Sync + Send,
        R: Send,
    {
        match self {
            BudgetedSubordinate::Sequential(e) => e.execute_batch(count, f),
            BudgetedSubordinate::Budgeted(e) => e.execute_batch(count, f),
        }
    }

    fn strategy(&self) -> ExecutionStrategy {
        match self {
            BudgetedSubordinate::Sequential(e) => e.strategy(),
            BudgetedSubordinate::Budgeted(e) => e.strategy(),
        }
    }

    fn num_threads(&self) -> usize {
        match self {
            BudgetedSubordinate::Sequential(e) => e.num_threads(),
            BudgetedSubordinate::Budgeted(e) => e.num_threads(),
        }
    }
}

impl HierarchicalExecution for BudgetedEngine {
    type SubordinateEngine = BudgetedSubordinate;

    fn subordinate(&self) -> Self::SubordinateEngine {
        if self.budget.inner_threads <= 1 {
            BudgetedSubordinate::Sequential(SequentialEngine::new())
        } else {
            BudgetedSubordinate::Budgeted(BudgetedEngine::new_subordinate(self.budget))
        }
    }

    fn subordinate_with_threads(&self, max_threads: usize) -> Self::SubordinateEngine {
        let actual_threads = max_threads.min(self.budget.inner_threads);
        if actual_threads <= 1 {
            BudgetedSubordinate::Sequential(SequentialEngine::new())
        } else {
            let subordinate_budget = ParallelismBudget {
                total_threads: actual_threads,
                outer_threads: 0,
                inner_threads: actual_threads,
            };
            BudgetedSubordinate::Budgeted(BudgetedEngine::new_subordinate(subordinate_budget))
        }
    }
}

impl HierarchicalExecution for SequentialEngine {
    type SubordinateEngine = SequentialEngine;

    fn subordinate(&self) -> Self::SubordinateEngine {
        self.clone()
    }

    fn subordinate_with_threads(&self, _max_threads: usize) -> Self::SubordinateEngine {
        self.clone()
    }
}

#[cfg(feature = "parallel")]
impl HierarchicalExecution for ParallelEngine {
    type SubordinateEngine = SequentialEngine;

    fn subordinate(&self) -> Self::SubordinateEngine {
        SequentialEngine::new()
    }

    fn subordinate_with_threads(&self, _max_threads: usize) -> Self::SubordinateEngine {
        SequentialEngine::new()
    }
}

/// Create a budgeted execution engine
pub fn budgeted_engine(budget: ParallelismBudget) -> BudgetedEngine {
    BudgetedEngine::new(budget)
}
