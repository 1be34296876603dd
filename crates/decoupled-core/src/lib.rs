//! Core types for decoupled pairwise-kernel sums
//!
//! This crate provides the pieces shared by every algorithm crate in the
//! workspace:
//!
//! 1. **Errors** - a single taxonomy covering input validation, degenerate
//!    pair sets, kernel failures and batch failures
//! 2. **Modes** - the pair-enumeration strategies and their counting rules
//! 3. **Execution Engines** - sequential, Rayon-parallel and budgeted
//!    hierarchical engines for fork-join work
//! 4. **Cancellation** - a shared token polled between chunks of work
//!
//! # Example
//!
//! ```rust
//! use decoupled_core::{execution::sequential, ExecutionEngine, Mode};
//!
//! let engine = sequential();
//! let per_row = engine.map_ranges(4, 2, |rows| {
//!     rows.map(|i| Mode::Symmetric.columns(i, 4).count()).sum::<usize>()
//! });
//! assert_eq!(per_row, vec![5, 1]);
//! assert_eq!(Mode::Symmetric.pair_count(4), 6);
//! ```

pub mod cancel;
pub mod error;
pub mod execution;
pub mod mode;

// Re-export core types
pub use cancel::CancellationToken;
pub use error::{Error, Result};
pub use mode::Mode;

pub use execution::{
    auto_engine, budgeted_engine, sequential, BudgetedEngine,
    BudgetedSubordinate, ExecutionEngine, ExecutionMode, ExecutionStrategy,
    HierarchicalExecution, ParallelismBudget, SequentialEngine,
};
#[cfg(feature = "parallel")]
pub use execution::{parallel, parallel_no_nested, parallel_with_budget, ParallelEngine};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        CancellationToken, Error, ExecutionEngine, ExecutionStrategy, HierarchicalExecution,
        Mode, Result, SequentialEngine,
    };

    #[cfg(feature = "parallel")]
    pub use crate::execution::{parallel, parallel_no_nested, ParallelEngine};
    pub use crate::execution::{auto_engine, sequential};
}
