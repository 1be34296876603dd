//! Shared utilities for integration tests

#![allow(dead_code)]

/// Lengths that exercise chunk boundaries
pub fn edge_case_lengths() -> Vec<usize> {
    vec![
        0,   // Empty
        1,   // Single row
        2,   // Smallest non-degenerate pair set
        3,   // Odd
        4,   // Minimum parallel chunk
        5,   // Minimum parallel chunk + 1
        63,  // Sequential chunk - 1
        64,  // Sequential chunk
        65,  // Sequential chunk + 1
        127, // Mersenne prime
        128, // Power of 2
    ]
}

/// Flatten per-range results back into the covered indices
pub fn covered_indices(ranges: &[std::ops::Range<usize>]) -> Vec<usize> {
    ranges.iter().flat_map(|r| r.clone()).collect()
}
