//! Pair enumeration modes
//!
//! A [`Mode`] decides which `(i, j)` index pairs a decoupled sum visits and in
//! which order. Both modes skip the diagonal `i == j`; they differ only in
//! whether `(j, i)` is visited in addition to `(i, j)`.
//!
//! # Symmetric kernels and the factor of two
//!
//! For a kernel with `K(x, y) == K(y, x)` the ordered-pair sum is exactly twice
//! the upper-triangular sum, and the ordered-pair count is exactly twice the
//! upper-triangular count. The two factors cancel in the mean, so
//! [`Mode::Symmetric`] returns the upper-triangular mean as-is. Do not scale
//! it by two.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pair-enumeration strategy for a decoupled sum
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Unordered distinct pairs `0 <= i < j < n`
    #[default]
    Symmetric,
    /// Ordered distinct pairs `i != j`
    Asymmetric,
}

impl Mode {
    /// Number of pairs visited over `n` items
    pub fn pair_count(self, n: usize) -> usize {
        let ordered = n.saturating_mul(n.saturating_sub(1));
        match self {
            Mode::Symmetric => ordered / 2,
            Mode::Asymmetric => ordered,
        }
    }

    /// Inner indices `j` visited for outer index `i`, ascending
    pub fn columns(self, i: usize, n: usize) -> impl Iterator<Item = usize> {
        let start = match self {
            Mode::Symmetric => i + 1,
            Mode::Asymmetric => 0,
        };
        (start..n).filter(move |&j| j != i)
    }

    /// All pairs in enumeration order: outer index ascending, inner ascending
    pub fn pairs(self, n: usize) -> impl Iterator<Item = (usize, usize)> {
        (0..n).flat_map(move |i| self.columns(i, n).map(move |j| (i, j)))
    }

    /// Lowercase name, as used in config documents
    pub fn name(self) -> &'static str {
        match self {
            Mode::Symmetric => "symmetric",
            Mode::Asymmetric => "asymmetric",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
