//! Exact `(sum, count)` accumulators

/// Running sum and pair count behind a decoupled sum
///
/// Workers each own one summary; [`merge`](PairSummary::merge) is the only
/// reduction step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PairSummary {
    /// Sum of kernel values
    pub sum: f64,
    /// Number of pairs evaluated
    pub count: usize,
}

impl PairSummary {
    /// Record one kernel value
    #[inline]
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    /// Combine two disjoint summaries
    pub fn merge(self, other: Self) -> Self {
        Self {
            sum: self.sum + other.sum,
            count: self.count + other.count,
        }
    }

    /// `sum / count`, or `None` when no pair was evaluated
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}
