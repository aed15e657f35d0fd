//! Core traits for hierarchical estimation

use privhist_core::{Domain, Grid, Result};

use crate::budget::BudgetScheduler;
use crate::types::HierarchicalTree;

/// Turns a noised tree into consistent per-node estimates
///
/// Implementations read each node's noisy count and write exactly one
/// estimate per node, such that every internal estimate equals the sum of
/// its children's.
pub trait ConsistencyAlgorithm {
    /// Name of this algorithm
    fn name(&self) -> &'static str;

    /// Estimate every node of a fully noised tree
    fn infer(&self, tree: &mut HierarchicalTree, scheduler: &BudgetScheduler) -> Result<()>;
}

/// A differentially private histogram estimator
pub trait EstimationEngine {
    /// Short name of this estimator
    fn name(&self) -> &str;

    /// Release an estimate of `domain` under `epsilon`, reproducible from `seed`
    ///
    /// The returned grid has the same shape as `domain`. A missing seed is
    /// rejected before any work is done.
    fn run(&self, domain: &Domain, epsilon: f64, seed: Option<u64>) -> Result<Grid>;
}
