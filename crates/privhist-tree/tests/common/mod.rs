//! Shared fixtures for integration tests
#![allow(dead_code)]

pub use approx::assert_relative_eq;

use privhist_tree::{Domain, HierarchicalEngine};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Relative tolerance for additivity checks
pub const ADDITIVITY_TOLERANCE: f64 = 1e-9;

/// Budget large enough that Laplace noise is negligible
pub const NOISELESS_EPSILON: f64 = 1e6;

/// Random 1-D counts in `[0, max]`
pub fn random_counts(seed: u64, len: usize, max: u32) -> Vec<u32> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(0..=max)).collect()
}

pub fn random_domain_1d(seed: u64, len: usize, max: u32) -> Domain {
    Domain::one_d(&random_counts(seed, len, max)).unwrap()
}

pub fn random_domain_2d(seed: u64, rows: usize, cols: usize, max: u32) -> Domain {
    let counts = random_counts(seed, rows * cols, max);
    Domain::from_counts(vec![rows, cols], &counts).unwrap()
}

/// Every 1-D preset
pub fn engines_1d() -> Vec<HierarchicalEngine> {
    vec![HierarchicalEngine::hb(), HierarchicalEngine::h2()]
}

/// Every 2-D preset with a fixed branching factor
pub fn engines_2d() -> Vec<HierarchicalEngine> {
    vec![
        HierarchicalEngine::quadtree(),
        HierarchicalEngine::hb2d(2).unwrap(),
        HierarchicalEngine::hb2d(3).unwrap(),
    ]
}
