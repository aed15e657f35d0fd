//! Laplace noise injection over a built tree

use privhist_core::{Error, NoiseSource, Result};
use tracing::debug;

use crate::budget::BudgetScheduler;
use crate::types::HierarchicalTree;

/// Noise every scheduled node of `tree`, returning the number of draws
///
/// Nodes are visited in post-order (children left to right, then the
/// parent) and each receives `true_count + Laplace(1 / level_budget)`. A
/// node whose level has no budget (an un-noised root) is skipped without
/// consuming a draw, so the draw sequence is fixed for a given tree shape.
pub fn inject<N: NoiseSource>(
    tree: &mut HierarchicalTree,
    scheduler: &BudgetScheduler,
    noise: &mut N,
) -> Result<usize> {
    if scheduler.height() != tree.height() {
        return Err(Error::InvalidInput(format!(
            "budget scheduled for height {} but tree has height {}",
            scheduler.height(),
            tree.height()
        )));
    }

    let mut draws = 0usize;
    for id in tree.postorder() {
        let node = tree.node(id);
        let Some(epsilon) = scheduler.level_budget(node.depth())? else {
            continue;
        };
        let noisy = node.true_count() + noise.laplace(1.0 / epsilon)?;
        tree.set_noisy_count(id, noisy)?;
        draws += 1;
    }

    debug!(draws, nodes = tree.len(), "noise injected");
    Ok(draws)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetSchedule;
    use crate::builders::TreeBuilder;
    use privhist_core::{Domain, SeededNoise};

    fn tree_of(counts: &[u32], arity: usize) -> HierarchicalTree {
        TreeBuilder::new(arity)
            .unwrap()
            .build(&Domain::one_d(counts).unwrap())
            .unwrap()
    }

    #[test]
    fn test_every_node_noised_once() {
        let mut tree = tree_of(&[1, 2, 3, 4, 5, 6, 7, 8], 2);
        let scheduler = BudgetScheduler::new(BudgetSchedule::Uniform, tree.height(), 1.0, true).unwrap();
        let mut noise = SeededNoise::new(3);

        let draws = inject(&mut tree, &scheduler, &mut noise).unwrap();
        assert_eq!(draws, tree.len());
        assert_eq!(noise.draws(), tree.len());
        assert!(tree.nodes().iter().all(|n| n.noisy_count().is_some()));

        // A second pass would overwrite noisy counts
        let err = inject(&mut tree, &scheduler, &mut noise).unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    #[test]
    fn test_unnoised_root_is_skipped() {
        let mut tree = tree_of(&[1, 2, 3, 4], 2);
        let scheduler = BudgetScheduler::new(BudgetSchedule::Uniform, tree.height(), 1.0, false).unwrap();
        let mut noise = SeededNoise::new(3);

        let draws = inject(&mut tree, &scheduler, &mut noise).unwrap();
        assert_eq!(draws, tree.len() - 1);
        assert!(tree.node(tree.root()).noisy_count().is_none());
    }

    #[test]
    fn test_noise_scale_follows_budget() {
        let mut tree = tree_of(&[10, 20, 30, 40], 2);
        let scheduler = BudgetScheduler::new(BudgetSchedule::Geometric, tree.height(), 1e9, true).unwrap();
        inject(&mut tree, &scheduler, &mut SeededNoise::new(11)).unwrap();

        for node in tree.nodes() {
            let noisy = node.noisy_count().unwrap();
            assert!((noisy - node.true_count()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_height_mismatch() {
        let mut tree = tree_of(&[1, 2, 3, 4], 2);
        let scheduler = BudgetScheduler::new(BudgetSchedule::Uniform, 5, 1.0, true).unwrap();
        assert!(inject(&mut tree, &scheduler, &mut SeededNoise::new(0)).is_err());
    }

    #[test]
    fn test_same_seed_same_noise() {
        let scheduler = BudgetScheduler::new(BudgetSchedule::Uniform, 3, 0.5, true).unwrap();
        let mut a = tree_of(&[5; 8], 2);
        let mut b = tree_of(&[5; 8], 2);
        inject(&mut a, &scheduler, &mut SeededNoise::new(99)).unwrap();
        inject(&mut b, &scheduler, &mut SeededNoise::new(99)).unwrap();
        assert_eq!(a, b);
    }
}
