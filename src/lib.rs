//! Differentially private histograms from consistent hierarchical trees
//!
//! Re-exports the workspace crates: [`privhist_core`] for errors, grids,
//! domains and seeded Laplace noise, and [`privhist_tree`] for tree
//! construction, budget schedules, consistency and the ready-made
//! estimators.

pub use privhist_core;
pub use privhist_tree;

pub use privhist_core::{Domain, Error, Grid, Result};
pub use privhist_tree::{
    estimate, estimate_with_config, BudgetSchedule, EstimationEngine, EstimationReport,
    HierarchicalEngine, HierarchyConfig,
};
