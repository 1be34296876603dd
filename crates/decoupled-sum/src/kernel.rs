//! The kernel capability
//!
//! A kernel scores one `(x, y)` pair with a real number. It is the only
//! caller-supplied logic in a decoupled sum; the aggregator never inspects
//! items itself.
//!
//! Kernels run from worker threads under parallel engines, so the aggregator
//! requires `Kernel<T> + Sync`. Kernels with internal state must synchronise
//! it themselves (atomics, `Mutex`).

/// Scores a pair of items
pub trait Kernel<T> {
    /// Evaluate the kernel on `(x, y)`
    ///
    /// An `Err` aborts the enclosing sum; the aggregator attaches the index
    /// pair before surfacing it.
    fn evaluate(&self, x: &T, y: &T) -> anyhow::Result<f64>;

    /// Name of this kernel for debugging/logging
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Plain closures are infallible kernels
impl<T, F> Kernel<T> for F
where
    F: Fn(&T, &T) -> f64,
{
    fn evaluate(&self, x: &T, y: &T) -> anyhow::Result<f64> {
        Ok(self(x, y))
    }
}

/// Adapter for closures that can fail
///
/// ```rust
/// use decoupled_sum::{FallibleKernel, Kernel};
///
/// let log_ratio = FallibleKernel(|a: &f64, b: &f64| {
///     anyhow::ensure!(*a > 0.0 && *b > 0.0, "log of non-positive value");
///     Ok((a / b).ln())
/// });
/// assert!(log_ratio.evaluate(&1.0, &1.0).is_ok());
/// assert!(log_ratio.evaluate(&-1.0, &1.0).is_err());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FallibleKernel<F>(pub F);

impl<T, F> Kernel<T> for FallibleKernel<F>
where
    F: Fn(&T, &T) -> anyhow::Result<f64>,
{
    fn evaluate(&self, x: &T, y: &T) -> anyhow::Result<f64> {
        (self.0)(x, y)
    }
}
