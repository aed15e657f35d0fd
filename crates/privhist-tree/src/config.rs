//! Configuration types for hierarchical estimators

use privhist_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::budget::BudgetSchedule;
use crate::consistency::{MinimumVariance, WeightRule, WeightedMean};
use crate::traits::ConsistencyAlgorithm;

/// How the per-axis branching factor is picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArityChoice {
    /// Minimize the closed-form query variance for the input size
    #[default]
    Optimized,
    /// Use the given branching factor
    Fixed(usize),
}

/// Consistency post-processing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyMethod {
    /// Exact least-squares inference; uniform budgets only
    MinimumVariance,
    /// Weighted averaging then mean consistency
    WeightedMean(WeightRule),
}

impl Default for ConsistencyMethod {
    fn default() -> Self {
        Self::MinimumVariance
    }
}

impl ConsistencyMethod {
    /// Get the name of this method
    pub fn name(&self) -> &'static str {
        match self {
            Self::MinimumVariance => "minimum_variance",
            Self::WeightedMean(_) => "weighted_mean",
        }
    }

    /// Instantiate the algorithm
    pub fn algorithm(&self) -> Box<dyn ConsistencyAlgorithm> {
        match *self {
            Self::MinimumVariance => Box::new(MinimumVariance),
            Self::WeightedMean(rule) => Box::new(WeightedMean::new(rule)),
        }
    }
}

/// Full description of a hierarchical estimator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Branching factor per axis
    pub arity: ArityChoice,
    /// Per-level budget split
    pub schedule: BudgetSchedule,
    /// Post-processing algorithm
    pub consistency: ConsistencyMethod,
    /// Whether the root level receives budget and noise
    pub noise_root: bool,
    /// Required input dimensionality, `None` accepts any
    pub dimensions: Option<usize>,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self::hb()
    }
}

impl HierarchyConfig {
    /// 1-D tree with optimized branching and least-squares inference
    pub fn hb() -> Self {
        Self {
            arity: ArityChoice::Optimized,
            schedule: BudgetSchedule::Uniform,
            consistency: ConsistencyMethod::MinimumVariance,
            noise_root: true,
            dimensions: Some(1),
        }
    }

    /// 1-D binary tree with least-squares inference
    pub fn h2() -> Self {
        Self {
            arity: ArityChoice::Fixed(2),
            ..Self::hb()
        }
    }

    /// 2-D tree, optimized branching when `branching == 0`
    ///
    /// The root is left un-noised and the budget is split evenly over the
    /// remaining levels.
    pub fn hb2d(branching: usize) -> Self {
        let arity = if branching == 0 {
            ArityChoice::Optimized
        } else {
            ArityChoice::Fixed(branching)
        };
        Self {
            arity,
            schedule: BudgetSchedule::Uniform,
            consistency: ConsistencyMethod::WeightedMean(WeightRule::SubtreeLevels),
            noise_root: false,
            dimensions: Some(2),
        }
    }

    /// 2-D quad tree with a geometric budget
    pub fn quadtree() -> Self {
        Self {
            arity: ArityChoice::Fixed(2),
            schedule: BudgetSchedule::Geometric,
            consistency: ConsistencyMethod::WeightedMean(WeightRule::BudgetRatio),
            noise_root: true,
            dimensions: Some(2),
        }
    }

    /// Set the branching choice
    pub fn with_arity(mut self, arity: ArityChoice) -> Self {
        self.arity = arity;
        self
    }

    /// Set the budget schedule
    pub fn with_schedule(mut self, schedule: BudgetSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Set the consistency method
    pub fn with_consistency(mut self, consistency: ConsistencyMethod) -> Self {
        self.consistency = consistency;
        self
    }

    /// Set whether the root level is noised
    pub fn with_noise_root(mut self, noise_root: bool) -> Self {
        self.noise_root = noise_root;
        self
    }

    /// Set the required input dimensionality
    pub fn with_dimensions(mut self, dimensions: Option<usize>) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Reject combinations no estimator can run
    pub fn validate(&self) -> Result<()> {
        if let ArityChoice::Fixed(b) = self.arity {
            if b < 2 {
                return Err(Error::InvalidInput(format!(
                    "fixed arity must be at least 2, got {b}"
                )));
            }
        }
        match self.dimensions {
            Some(0) => {
                return Err(Error::InvalidParameter(
                    "dimensions must be at least 1".to_string(),
                ))
            }
            Some(d) if d > 2 && self.arity == ArityChoice::Optimized => {
                return Err(Error::InvalidParameter(format!(
                    "optimized arity is only available for 1D and 2D data, configured for {d}D"
                )))
            }
            _ => {}
        }
        if self.consistency == ConsistencyMethod::MinimumVariance {
            if self.schedule != BudgetSchedule::Uniform {
                return Err(Error::InvalidParameter(
                    "minimum-variance inference needs a uniform schedule".to_string(),
                ));
            }
            if !self.noise_root {
                return Err(Error::InvalidParameter(
                    "minimum-variance inference needs a noised root".to_string(),
                ));
            }
        }
        Ok(())
    }
}
