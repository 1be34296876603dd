//! Shared utilities for integration tests

#![allow(dead_code)]

pub use approx::assert_relative_eq;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Mutex;

pub const EPSILON: f64 = 1e-10;

/// Reproducible uniform sample in `[-10, 10)`
pub fn seeded_sample(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-10.0..10.0)).collect()
}

/// `count` bootstrap resamples of `sample`, drawn with replacement
pub fn resamples(sample: &[f64], count: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            (0..sample.len())
                .map(|_| sample[rng.gen_range(0..sample.len())])
                .collect()
        })
        .collect()
}

/// Kernel that records the values it was called with, in call order
#[derive(Default)]
pub struct Recording {
    calls: Mutex<Vec<(f64, f64)>>,
}

impl Recording {
    pub fn calls(&self) -> Vec<(f64, f64)> {
        self.calls.lock().unwrap().clone()
    }
}

impl decoupled_sum::Kernel<f64> for Recording {
    fn evaluate(&self, x: &f64, y: &f64) -> anyhow::Result<f64> {
        self.calls.lock().unwrap().push((*x, *y));
        Ok(x + y)
    }
}

/// Items that encode their own index, so recorded calls map back to pairs
pub fn indexed(n: usize, offset: f64) -> Vec<f64> {
    (0..n).map(|i| i as f64 + offset).collect()
}

/// Sum-then-divide over explicitly enumerated pairs
pub fn naive_mean(x: &[f64], y: &[f64], k: impl Fn(f64, f64) -> f64, symmetric: bool) -> f64 {
    let n = x.len();
    let mut total = 0.0;
    let mut count = 0usize;
    for i in 0..n {
        for j in 0..n {
            if i == j || (symmetric && j < i) {
                continue;
            }
            total += k(x[i], y[j]);
            count += 1;
        }
    }
    total / count as f64
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
