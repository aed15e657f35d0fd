//! End-to-end hierarchical estimators
//!
//! A [`HierarchicalEngine`] runs the whole pipeline for one configuration:
//! pick the arity, build and pad the tree, split the budget, noise every
//! scheduled node, enforce consistency and read the leaves back out over the
//! caller's original shape.

use privhist_core::{check_epsilon, require_seed, Domain, Error, Grid, Result, SeededNoise};
use tracing::{debug, instrument};

use crate::branching::{choose_branching, choose_branching_2d};
use crate::budget::{BudgetSchedule, BudgetScheduler};
use crate::builders::TreeBuilder;
use crate::config::{ArityChoice, ConsistencyMethod, HierarchyConfig};
use crate::consistency::WeightRule;
use crate::injector::inject;
use crate::traits::EstimationEngine;
use crate::types::HierarchicalTree;

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct EstimationReport {
    /// Consistent estimate, same shape as the input domain
    pub estimate: Grid,
    /// The noised and estimated tree over the padded domain
    pub tree: HierarchicalTree,
    /// Per-axis branching factor used
    pub arity: usize,
    /// Height of the tree
    pub height: usize,
    /// Laplace samples drawn
    pub noise_draws: usize,
}

/// A named estimator backed by a [`HierarchyConfig`]
#[derive(Debug, Clone)]
pub struct HierarchicalEngine {
    name: String,
    config: HierarchyConfig,
}

impl HierarchicalEngine {
    /// Create an engine, validating the configuration
    pub fn new(name: impl Into<String>, config: HierarchyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
        })
    }

    /// 1-D tree with optimized branching
    pub fn hb() -> Self {
        Self::preset("HB", HierarchyConfig::hb())
    }

    /// 1-D binary tree
    pub fn h2() -> Self {
        Self::preset("H2", HierarchyConfig::h2())
    }

    /// 2-D tree, optimized branching when `branching == 0`
    pub fn hb2d(branching: usize) -> Result<Self> {
        Self::new("HB2D", HierarchyConfig::hb2d(branching))
    }

    /// 2-D quad tree with geometric budgets
    pub fn quadtree() -> Self {
        Self::preset("QuadTree", HierarchyConfig::quadtree())
    }

    fn preset(name: &str, config: HierarchyConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &HierarchyConfig {
        &self.config
    }

    /// Branching factor this engine would use for `domain`
    pub fn resolve_arity(&self, domain: &Domain) -> Result<usize> {
        match self.config.arity {
            ArityChoice::Fixed(b) => Ok(b),
            ArityChoice::Optimized => match domain.ndim() {
                1 => choose_branching(domain.len()),
                2 => choose_branching_2d(domain.len()),
                d => Err(Error::InvalidInput(format!(
                    "optimized arity is only available for 1D and 2D data, got {d}D"
                ))),
            },
        }
    }

    /// Run the pipeline and keep every intermediate result
    #[instrument(skip(self, domain), fields(engine = %self.name, shape = ?domain.shape()))]
    pub fn run_with_report(
        &self,
        domain: &Domain,
        epsilon: f64,
        seed: Option<u64>,
    ) -> Result<EstimationReport> {
        let seed = require_seed(seed)?;
        check_epsilon(epsilon)?;
        self.config.validate()?;
        if let Some(expected) = self.config.dimensions {
            if domain.ndim() != expected {
                return Err(Error::dimension_mismatch(expected, domain.ndim(), &self.name));
            }
        }

        let arity = self.resolve_arity(domain)?;
        let mut tree = TreeBuilder::new(arity)?.build(domain)?;
        let height = tree.height();
        debug!(arity, height, padded = ?tree.padded_shape(), nodes = tree.len(), "tree built");

        let scheduler =
            BudgetScheduler::new(self.config.schedule, height, epsilon, self.config.noise_root)?;
        let mut noise = SeededNoise::new(seed);
        let noise_draws = inject(&mut tree, &scheduler, &mut noise)?;

        let algorithm = self.config.consistency.algorithm();
        algorithm.infer(&mut tree, &scheduler)?;
        debug!(algorithm = algorithm.name(), "consistency enforced");

        let estimate = tree.leaf_estimates()?.truncated(domain.shape())?;
        Ok(EstimationReport {
            estimate,
            tree,
            arity,
            height,
            noise_draws,
        })
    }
}

impl EstimationEngine for HierarchicalEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, domain: &Domain, epsilon: f64, seed: Option<u64>) -> Result<Grid> {
        self.run_with_report(domain, epsilon, seed)
            .map(|report| report.estimate)
    }
}

/// Configuration matching an input dimensionality and optional overrides
///
/// 1-D data uses least-squares inference unless a geometric schedule is
/// requested. Higher-dimensional data follows the 2-D tree (uniform) or
/// quad tree (geometric) layout. Without an explicit arity, geometric
/// schedules always split in two per axis, as do uniform ones beyond two
/// dimensions; the branching optimizer only models uniform budgets.
pub fn config_for(
    ndim: usize,
    arity: Option<usize>,
    schedule: Option<BudgetSchedule>,
) -> HierarchyConfig {
    let schedule = schedule.unwrap_or_default();
    let base = match (ndim, schedule) {
        (1, BudgetSchedule::Uniform) => HierarchyConfig::hb(),
        (1, BudgetSchedule::Geometric) => HierarchyConfig::hb()
            .with_schedule(BudgetSchedule::Geometric)
            .with_consistency(ConsistencyMethod::WeightedMean(WeightRule::BudgetRatio)),
        (_, BudgetSchedule::Uniform) => HierarchyConfig::hb2d(0),
        (_, BudgetSchedule::Geometric) => HierarchyConfig::quadtree(),
    };
    let arity = match (arity, schedule) {
        (Some(b), _) => ArityChoice::Fixed(b),
        (None, BudgetSchedule::Geometric) => ArityChoice::Fixed(2),
        (None, BudgetSchedule::Uniform) if ndim > 2 => ArityChoice::Fixed(2),
        (None, BudgetSchedule::Uniform) => ArityChoice::Optimized,
    };
    base.with_arity(arity).with_dimensions(Some(ndim))
}

/// Estimate `domain` with `epsilon`, reproducible from `seed`
///
/// The output has exactly the input's shape.
pub fn estimate(
    domain: &Domain,
    epsilon: f64,
    seed: Option<u64>,
    arity: Option<usize>,
    schedule: Option<BudgetSchedule>,
) -> Result<Grid> {
    let config = config_for(domain.ndim(), arity, schedule);
    estimate_with_config(domain, epsilon, seed, config).map(|report| report.estimate)
}

/// Estimate `domain` under an explicit configuration
pub fn estimate_with_config(
    domain: &Domain,
    epsilon: f64,
    seed: Option<u64>,
    config: HierarchyConfig,
) -> Result<EstimationReport> {
    HierarchicalEngine::new("custom", config)?.run_with_report(domain, epsilon, seed)
}
