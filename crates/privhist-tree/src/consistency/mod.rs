//! Consistency post-processing for noised hierarchies
//!
//! Two algorithms share the [`ConsistencyAlgorithm`] interface. They come
//! from different optimality criteria and keep their own bookkeeping; they
//! are not expected to agree numerically on the same noised tree.
//!
//! - [`MinimumVariance`]: generalized least squares over a complete tree
//!   with equal per-level variance (Hay et al., PVLDB 2010)
//! - [`WeightedMean`]: per-level weighted averaging followed by mean
//!   consistency (Cormode et al., ICDE 2012; Qardaji et al., PVLDB 2013)

pub mod minimum_variance;
pub mod weighted_mean;

pub use minimum_variance::MinimumVariance;
pub use weighted_mean::{WeightRule, WeightedMean};

pub use crate::traits::ConsistencyAlgorithm;

use privhist_core::{Error, Result};

use crate::types::{HierarchicalTree, NodeId, TreeNode};

fn noisy(node: &TreeNode) -> Result<f64> {
    node.noisy_count().ok_or_else(|| {
        Error::InvariantViolation(format!("node {} was never noised", node.region()))
    })
}

/// Write one estimate per node, checking each leaf is assigned exactly once
fn commit(tree: &mut HierarchicalTree, values: &[f64], leaf_visits: &[usize]) -> Result<()> {
    for id in 0..tree.len() {
        let node = tree.node(id);
        if node.is_leaf() && leaf_visits[id] != 1 {
            return Err(Error::InvariantViolation(format!(
                "leaf {} visited {} times during inference",
                node.region(),
                leaf_visits[id]
            )));
        }
    }
    for (id, &value) in values.iter().enumerate() {
        tree.set_estimate(id as NodeId, value)?;
    }
    Ok(())
}
