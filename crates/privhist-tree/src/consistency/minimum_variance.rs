//! Minimum-variance consistent inference over a complete k-ary tree
//!
//! Given independent noisy counts of equal variance at every node, two
//! linear passes produce the generalized least-squares estimate: the
//! unique additive assignment closest to the observations.

use privhist_core::{Error, Result};
use tracing::trace;

use super::{commit, noisy};
use crate::budget::{BudgetSchedule, BudgetScheduler};
use crate::traits::ConsistencyAlgorithm;
use crate::types::HierarchicalTree;

/// Exact MVUE inference for uniform-budget trees
///
/// Bottom-up, each internal node with `alpha = k^(levels - 1)` (a leaf's
/// subtree has one level) gets
/// `z = ((k-1) * alpha * noisy + (alpha-1) * sum(child z)) / (k * alpha - 1)`;
/// top-down, each non-root node gets `z += (parent z - parent's child sum) / k`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinimumVariance;

impl ConsistencyAlgorithm for MinimumVariance {
    fn name(&self) -> &'static str {
        "minimum_variance"
    }

    fn infer(&self, tree: &mut HierarchicalTree, scheduler: &BudgetScheduler) -> Result<()> {
        if scheduler.schedule() != BudgetSchedule::Uniform || !scheduler.noise_root() {
            return Err(Error::InvalidParameter(
                "minimum-variance inference needs every level noised under a uniform budget"
                    .to_string(),
            ));
        }

        let k = tree.fanout();
        let kf = k as f64;
        let mut z = vec![0.0; tree.len()];
        let mut child_z = vec![0.0; tree.len()];

        for id in tree.postorder() {
            let node = tree.node(id);
            let observed = noisy(node)?;
            if node.is_leaf() {
                z[id] = observed;
                continue;
            }
            if node.children().len() != k {
                return Err(Error::InvariantViolation(format!(
                    "node {} has {} children in a tree of fanout {k}",
                    node.region(),
                    node.children().len()
                )));
            }

            let alpha = kf.powi(node.height() as i32);
            let total: f64 = node.children().iter().map(|&c| z[c]).sum();
            child_z[id] = total;
            z[id] = ((kf - 1.0) * alpha * observed + (alpha - 1.0) * total) / (kf * alpha - 1.0);
        }

        let mut leaf_visits = vec![0usize; tree.len()];
        for id in tree.preorder() {
            let node = tree.node(id);
            if let Some(parent) = node.parent() {
                z[id] += (z[parent] - child_z[parent]) / kf;
            }
            if node.is_leaf() {
                leaf_visits[id] += 1;
            }
        }

        trace!(root = z[tree.root()], nodes = tree.len(), "minimum-variance inference done");
        commit(tree, &z, &leaf_visits)
    }
}
