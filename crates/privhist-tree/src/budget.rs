//! Per-level privacy budget schedules
//!
//! Each tree level receives a share of the total epsilon. Every root-to-leaf
//! path crosses each noised level exactly once, so under sequential
//! composition the shares along one path must add up to the total.

use privhist_core::{check_epsilon, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the total budget is spread over tree levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetSchedule {
    /// Every level gets `epsilon / levels`
    #[default]
    Uniform,
    /// Level `d` gets a share proportional to `2^(d/3)`; leaves get the most
    Geometric,
}

/// Budget of one level in a tree whose `height + 1` levels are all noised
///
/// - uniform: `epsilon / (height + 1)`
/// - geometric: `2^(depth/3) * epsilon * (2^(1/3) - 1) / (2^((height+1)/3) - 1)`
pub fn level_budget(
    schedule: BudgetSchedule,
    depth: usize,
    height: usize,
    total_epsilon: f64,
) -> Result<f64> {
    check_epsilon(total_epsilon)?;
    if depth > height {
        return Err(Error::InvalidParameter(format!(
            "depth {depth} is below the leaves of a tree of height {height}"
        )));
    }
    let budget = match schedule {
        BudgetSchedule::Uniform => total_epsilon / (height + 1) as f64,
        BudgetSchedule::Geometric => {
            let cube_root_two = 2f64.powf(1.0 / 3.0);
            2f64.powf(depth as f64 / 3.0) * total_epsilon * (cube_root_two - 1.0)
                / (2f64.powf((height + 1) as f64 / 3.0) - 1.0)
        }
    };
    Ok(budget)
}

/// Level budgets for one concrete tree
///
/// When the root is not noised it receives no budget and the schedule is
/// laid over the remaining `height` levels, depth 1 acting as the top.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetScheduler {
    schedule: BudgetSchedule,
    height: usize,
    total_epsilon: f64,
    noise_root: bool,
}

impl BudgetScheduler {
    /// Create a scheduler for a tree of the given height
    pub fn new(
        schedule: BudgetSchedule,
        height: usize,
        total_epsilon: f64,
        noise_root: bool,
    ) -> Result<Self> {
        check_epsilon(total_epsilon)?;
        if !noise_root && height == 0 {
            return Err(Error::InvalidParameter(
                "a single-level tree must noise its root".to_string(),
            ));
        }
        let scheduler = Self {
            schedule,
            height,
            total_epsilon,
            noise_root,
        };
        debug!(?schedule, height, total_epsilon, noise_root, budgets = ?scheduler.budgets(), "level budgets");
        Ok(scheduler)
    }

    /// Schedule in use
    pub fn schedule(&self) -> BudgetSchedule {
        self.schedule
    }

    /// Height of the tree being scheduled
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total epsilon being split
    pub fn total_epsilon(&self) -> f64 {
        self.total_epsilon
    }

    /// Whether the root level is noised
    pub fn noise_root(&self) -> bool {
        self.noise_root
    }

    /// Number of levels that receive budget
    pub fn noised_levels(&self) -> usize {
        if self.noise_root {
            self.height + 1
        } else {
            self.height
        }
    }

    /// Budget of the level at `depth`, `None` for an un-noised root
    pub fn level_budget(&self, depth: usize) -> Result<Option<f64>> {
        if depth > self.height {
            return Err(Error::InvalidParameter(format!(
                "depth {depth} is below the leaves of a tree of height {}",
                self.height
            )));
        }
        if self.noise_root {
            return level_budget(self.schedule, depth, self.height, self.total_epsilon).map(Some);
        }
        if depth == 0 {
            return Ok(None);
        }
        level_budget(self.schedule, depth - 1, self.height - 1, self.total_epsilon).map(Some)
    }

    /// Budgets for every depth, root first
    pub fn budgets(&self) -> Vec<Option<f64>> {
        (0..=self.height)
            .map(|depth| self.level_budget(depth).ok().flatten())
            .collect()
    }

    /// Privacy loss composed along any root-to-leaf path
    pub fn composed_epsilon(&self) -> f64 {
        self.budgets().into_iter().flatten().sum()
    }
}
