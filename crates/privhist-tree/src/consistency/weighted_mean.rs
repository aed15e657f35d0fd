//! Weighted averaging followed by mean consistency
//!
//! Pass one blends every internal node's noisy count with the sum of its
//! children's (already blended) counts. Pass two pushes each parent's
//! residual down, splitting it evenly over the children, so children always
//! add up to their parent.

use privhist_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::{commit, noisy};
use crate::budget::BudgetScheduler;
use crate::traits::ConsistencyAlgorithm;
use crate::types::{HierarchicalTree, TreeNode};

/// How a node's own count is weighted against its children's sum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightRule {
    /// Weight from the level budgets:
    /// `alpha = (2 e_self)^2 / ((2 e_self)^2 + e_child^2)`, whatever the fanout
    #[default]
    BudgetRatio,
    /// Weight from the subtree size alone, for uniform budgets:
    /// `alpha = (f^(h+1) - f^h) / (f^(h+1) - 1)` at height `h`
    SubtreeLevels,
}

impl WeightRule {
    /// Weight on the node's own count
    pub fn alpha(&self, node: &TreeNode, scheduler: &BudgetScheduler) -> Result<f64> {
        match self {
            WeightRule::BudgetRatio => {
                let budget = |depth: usize| {
                    scheduler.level_budget(depth)?.ok_or_else(|| {
                        Error::InvalidParameter(format!("level {depth} has no budget to weight by"))
                    })
                };
                let own = (2.0 * budget(node.depth())?).powi(2);
                let child = budget(node.depth() + 1)?.powi(2);
                Ok(own / (own + child))
            }
            WeightRule::SubtreeLevels => {
                let f = node.children().len() as f64;
                let h = node.height() as i32;
                Ok((f.powi(h + 1) - f.powi(h)) / (f.powi(h + 1) - 1.0))
            }
        }
    }
}

/// Weighted averaging plus mean consistency
///
/// Works with any budget schedule. When the root is not noised it carries
/// no observation: it is not averaged, its children are not adjusted, and
/// its estimate is the sum of its children.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedMean {
    rule: WeightRule,
}

impl WeightedMean {
    /// Create the algorithm with a given weighting rule
    pub fn new(rule: WeightRule) -> Self {
        Self { rule }
    }

    /// Weighting rule in use
    pub fn rule(&self) -> WeightRule {
        self.rule
    }
}

impl ConsistencyAlgorithm for WeightedMean {
    fn name(&self) -> &'static str {
        "weighted_mean"
    }

    fn infer(&self, tree: &mut HierarchicalTree, scheduler: &BudgetScheduler) -> Result<()> {
        let root = tree.root();
        let root_observed = tree.node(root).noisy_count().is_some();
        if root_observed != scheduler.noise_root() {
            return Err(Error::InvariantViolation(format!(
                "root noised = {root_observed} but schedule expects {}",
                scheduler.noise_root()
            )));
        }

        let mut counts = vec![0.0; tree.len()];
        for id in 0..tree.len() {
            if id != root || root_observed {
                counts[id] = noisy(tree.node(id))?;
            }
        }

        // Weighted averaging, children before parents
        for id in tree.postorder() {
            let node = tree.node(id);
            if node.is_leaf() || (id == root && !root_observed) {
                continue;
            }
            let alpha = self.rule.alpha(node, scheduler)?;
            let total: f64 = node.children().iter().map(|&c| counts[c]).sum();
            counts[id] = alpha * counts[id] + (1.0 - alpha) * total;
        }

        // Mean consistency, parents before children. `child_sum` holds the
        // sum of a node's children before any of them is adjusted.
        let mut child_sum = vec![0.0; tree.len()];
        let mut leaf_visits = vec![0usize; tree.len()];
        for id in tree.preorder() {
            let node = tree.node(id);
            if let Some(parent) = node.parent() {
                if parent != root || root_observed {
                    let fanout = tree.node(parent).children().len() as f64;
                    counts[id] += (counts[parent] - child_sum[parent]) / fanout;
                }
            }
            if node.is_leaf() {
                leaf_visits[id] += 1;
            } else {
                child_sum[id] = node.children().iter().map(|&c| counts[c]).sum();
            }
        }

        if !root_observed {
            counts[root] = child_sum[root];
        }

        trace!(rule = ?self.rule, root = counts[root], "weighted-mean inference done");
        commit(tree, &counts, &leaf_visits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetSchedule;
    use crate::builders::TreeBuilder;
    use crate::types::NodeId;
    use approx::assert_relative_eq;
    use privhist_core::{Domain, SeededNoise};

    fn noised_tree(domain: &Domain, arity: usize, scheduler: &BudgetScheduler, seed: u64) -> HierarchicalTree {
        let mut tree = TreeBuilder::new(arity).unwrap().build(domain).unwrap();
        crate::injector::inject(&mut tree, scheduler, &mut SeededNoise::new(seed)).unwrap();
        tree
    }

    #[test]
    fn test_budget_ratio_quad_specialization() {
        let domain = Domain::two_d(&[vec![0u32; 4], vec![0; 4], vec![0; 4], vec![0; 4]]).unwrap();
        let tree = TreeBuilder::new(2).unwrap().build(&domain).unwrap();
        let scheduler = BudgetScheduler::new(BudgetSchedule::Geometric, tree.height(), 1.0, true).unwrap();

        let root = tree.node(tree.root());
        let e1 = scheduler.level_budget(0).unwrap().unwrap();
        let e2 = scheduler.level_budget(1).unwrap().unwrap();
        let expected = 4.0 * e1.powi(2) / (4.0 * e1.powi(2) + e2.powi(2));
        assert_relative_eq!(WeightRule::BudgetRatio.alpha(root, &scheduler).unwrap(), expected, max_relative = 1e-15);
    }

    #[test]
    fn test_budget_ratio_ignores_fanout() {
        let domain = Domain::one_d(&[0u32; 4]).unwrap();
        let tree = TreeBuilder::new(2).unwrap().build(&domain).unwrap();
        let scheduler = BudgetScheduler::new(BudgetSchedule::Geometric, tree.height(), 1.0, true).unwrap();

        let root = tree.node(tree.root());
        assert_eq!(root.children().len(), 2);
        let alpha = WeightRule::BudgetRatio.alpha(root, &scheduler).unwrap();
        assert_relative_eq!(alpha, 4.0 / (4.0 + 2f64.powf(2.0 / 3.0)), max_relative = 1e-12);
        assert_relative_eq!(alpha, 0.71589634658335, max_relative = 1e-12);
    }

    #[test]
    fn test_subtree_levels_weight() {
        let domain = Domain::two_d(&[vec![0u32; 4], vec![0; 4], vec![0; 4], vec![0; 4]]).unwrap();
        let tree = TreeBuilder::new(2).unwrap().build(&domain).unwrap();
        let scheduler = BudgetScheduler::new(BudgetSchedule::Uniform, tree.height(), 1.0, false).unwrap();

        // Parent of leaves: f / (f + 1)
        let quadrant = tree.node(tree.node(tree.root()).children()[0]);
        assert_relative_eq!(WeightRule::SubtreeLevels.alpha(quadrant, &scheduler).unwrap(), 0.8, epsilon = 1e-15);
        // Root: (64 - 16) / 63
        let root = tree.node(tree.root());
        assert_relative_eq!(WeightRule::SubtreeLevels.alpha(root, &scheduler).unwrap(), 48.0 / 63.0, epsilon = 1e-15);
    }

    #[test]
    fn test_hand_computed_binary_tree() {
        let mut tree = TreeBuilder::new(2)
            .unwrap()
            .build(&Domain::one_d(&[0u32, 0]).unwrap())
            .unwrap();
        let r = tree.root();
        let (a, b) = (tree.node(r).children()[0], tree.node(r).children()[1]);
        tree.set_noisy_count(a, 1.0).unwrap();
        tree.set_noisy_count(b, 3.0).unwrap();
        tree.set_noisy_count(r, 6.0).unwrap();
        let scheduler = BudgetScheduler::new(BudgetSchedule::Geometric, 1, 1.0, true).unwrap();

        WeightedMean::new(WeightRule::BudgetRatio).infer(&mut tree, &scheduler).unwrap();

        // e_child / e_self = 2^(1/3)
        let alpha = 4.0 / (4.0 + 2f64.powf(2.0 / 3.0));
        let root = alpha * 6.0 + (1.0 - alpha) * 4.0;
        let est = tree.leaf_estimates().unwrap().into_values();
        assert_relative_eq!(tree.node(r).estimate().unwrap(), root, max_relative = 1e-12);
        assert_relative_eq!(est[0], 1.0 + (root - 4.0) / 2.0, max_relative = 1e-12);
        assert_relative_eq!(est[1], 3.0 + (root - 4.0) / 2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_consistent_input_is_fixed_point() {
        let domain = Domain::two_d(&[vec![1u32, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]).unwrap();
        let mut tree = TreeBuilder::new(2).unwrap().build(&domain).unwrap();
        for id in 0..tree.len() {
            let truth = tree.node(id).true_count();
            tree.set_noisy_count(id, truth).unwrap();
        }
        let scheduler = BudgetScheduler::new(BudgetSchedule::Geometric, tree.height(), 1.0, true).unwrap();
        WeightedMean::default().infer(&mut tree, &scheduler).unwrap();
        for node in tree.nodes() {
            assert_relative_eq!(node.estimate().unwrap(), node.true_count(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_additive_with_noised_root() {
        let domain = Domain::two_d(&vec![vec![3u32; 8]; 8]).unwrap();
        let scheduler = BudgetScheduler::new(BudgetSchedule::Geometric, 3, 0.1, true).unwrap();
        let mut tree = noised_tree(&domain, 2, &scheduler, 5);
        WeightedMean::new(WeightRule::BudgetRatio).infer(&mut tree, &scheduler).unwrap();
        tree.check_additivity(1e-9).unwrap();
    }

    #[test]
    fn test_additive_without_root() {
        let domain = Domain::two_d(&vec![vec![1u32; 9]; 9]).unwrap();
        let scheduler = BudgetScheduler::new(BudgetSchedule::Uniform, 2, 0.1, false).unwrap();
        let mut tree = noised_tree(&domain, 3, &scheduler, 8);
        assert!(tree.node(tree.root()).noisy_count().is_none());

        WeightedMean::new(WeightRule::SubtreeLevels).infer(&mut tree, &scheduler).unwrap();
        tree.check_additivity(1e-9).unwrap();

        // The root has no observation, so its estimate is just its children's sum
        let root = tree.node(tree.root());
        let children: f64 = root.children().iter().map(|&c| tree.node(c).estimate().unwrap()).sum();
        assert_relative_eq!(root.estimate().unwrap(), children, max_relative = 1e-12);
    }

    // Plain recursive weighted averaging over the tree, `None` marking a
    // node without an observation
    fn reference_weight_avg(
        tree: &HierarchicalTree,
        counts: &mut [Option<f64>],
        id: NodeId,
        alpha: &dyn Fn(&TreeNode) -> f64,
    ) {
        let node = tree.node(id);
        if node.is_leaf() {
            return;
        }
        for &child in node.children() {
            reference_weight_avg(tree, counts, child, alpha);
        }
        if let Some(own) = counts[id] {
            let total: f64 = node.children().iter().map(|&c| counts[c].unwrap()).sum();
            let a = alpha(node);
            counts[id] = Some(a * own + (1.0 - a) * total);
        }
    }

    // Plain recursive mean consistency; nodes at `top_depth` are not adjusted
    fn reference_mean_const(
        tree: &HierarchicalTree,
        counts: &mut [Option<f64>],
        id: NodeId,
        cursum: f64,
        top_depth: usize,
        divisor: f64,
    ) {
        let node = tree.node(id);
        if node.depth() != top_depth {
            let parent = counts[node.parent().unwrap()].unwrap();
            counts[id] = Some(counts[id].unwrap() + (parent - cursum) / divisor);
        }
        let total: f64 = node.children().iter().map(|&c| counts[c].unwrap()).sum();
        for &child in node.children() {
            reference_mean_const(tree, counts, child, total, top_depth, divisor);
        }
    }

    fn hand_noised(domain: &Domain, arity: usize, noise_root: bool) -> (HierarchicalTree, Vec<Option<f64>>) {
        let mut tree = TreeBuilder::new(arity).unwrap().build(domain).unwrap();
        let mut observed = vec![None; tree.len()];
        for id in 0..tree.len() {
            if id == tree.root() && !noise_root {
                continue;
            }
            let value = tree.node(id).true_count() + ((id * 37) % 11) as f64 - 5.0;
            tree.set_noisy_count(id, value).unwrap();
            observed[id] = Some(value);
        }
        (tree, observed)
    }

    #[test]
    fn test_quadtree_matches_recurrences() {
        let rows: Vec<Vec<u32>> = (0..4).map(|r| (0..4).map(|c| 4 * r + c).collect()).collect();
        let domain = Domain::two_d(&rows).unwrap();
        let (mut tree, mut expected) = hand_noised(&domain, 2, true);
        assert_eq!(tree.height(), 2);

        let epsilon = 1.0;
        let height = tree.height();
        let level = |depth: usize| {
            2f64.powf(depth as f64 / 3.0) * epsilon * (2f64.powf(1.0 / 3.0) - 1.0)
                / (2f64.powf((height + 1) as f64 / 3.0) - 1.0)
        };
        let alpha = |node: &TreeNode| {
            let (e1, e2) = (level(node.depth()), level(node.depth() + 1));
            4.0 * e1 * e1 / (4.0 * e1 * e1 + e2 * e2)
        };
        reference_weight_avg(&tree, &mut expected, tree.root(), &alpha);
        reference_mean_const(&tree, &mut expected, tree.root(), 0.0, 0, 4.0);

        let scheduler = BudgetScheduler::new(BudgetSchedule::Geometric, height, epsilon, true).unwrap();
        WeightedMean::new(WeightRule::BudgetRatio).infer(&mut tree, &scheduler).unwrap();

        for (id, node) in tree.nodes().iter().enumerate() {
            assert_relative_eq!(node.estimate().unwrap(), expected[id].unwrap(), max_relative = 1e-12);
        }
    }

    #[test]
    fn test_rootless_hb2d_matches_recurrences() {
        for (side, arity) in [(4usize, 2usize), (9, 3)] {
            let rows: Vec<Vec<u32>> = (0..side)
                .map(|r| (0..side).map(|c| ((r * 5 + c * 3) % 7) as u32).collect())
                .collect();
            let domain = Domain::two_d(&rows).unwrap();
            let (mut tree, mut expected) = hand_noised(&domain, arity, false);
            assert_eq!(tree.height(), 2);

            let fanout = (arity * arity) as f64;
            let alpha = |node: &TreeNode| {
                let h = node.height() as i32;
                (fanout.powi(h + 1) - fanout.powi(h)) / (fanout.powi(h + 1) - 1.0)
            };
            reference_weight_avg(&tree, &mut expected, tree.root(), &alpha);
            for &child in tree.node(tree.root()).children() {
                reference_mean_const(&tree, &mut expected, child, 0.0, 1, fanout);
            }

            let scheduler = BudgetScheduler::new(BudgetSchedule::Uniform, 2, 1.0, false).unwrap();
            WeightedMean::new(WeightRule::SubtreeLevels).infer(&mut tree, &scheduler).unwrap();

            for id in tree.leaves() {
                assert_relative_eq!(
                    tree.node(id).estimate().unwrap(),
                    expected[id].unwrap(),
                    max_relative = 1e-12
                );
            }
            let root = tree.node(tree.root());
            let children: f64 = root.children().iter().map(|&c| expected[c].unwrap()).sum();
            assert_relative_eq!(root.estimate().unwrap(), children, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_root_state_must_match_schedule() {
        let domain = Domain::one_d(&[1u32, 2, 3, 4]).unwrap();
        let noised = BudgetScheduler::new(BudgetSchedule::Uniform, 2, 1.0, true).unwrap();
        let skipped = BudgetScheduler::new(BudgetSchedule::Uniform, 2, 1.0, false).unwrap();
        let mut tree = noised_tree(&domain, 2, &noised, 1);
        assert!(matches!(
            WeightedMean::default().infer(&mut tree, &skipped),
            Err(Error::InvariantViolation(_))
        ));
    }
}
