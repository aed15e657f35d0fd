//! Hierarchical tree estimators for differentially private histograms
//!
//! A domain of counts is padded to a complete tree, every scheduled level is
//! noised with Laplace noise, and a consistency pass makes each parent's
//! estimate equal the sum of its children's. The released estimate is the
//! leaf layer, truncated back to the caller's shape.
//!
//! # Key Features
//!
//! - **Arena tree**: nodes addressed by [`NodeId`], any dimensionality
//! - **Branching optimizer**: closed-form variance minimization for 1-D and 2-D
//! - **Budget schedules**: uniform or geometric per-level epsilon
//! - **Two consistency algorithms**: [`MinimumVariance`] and [`WeightedMean`]
//! - **Presets**: HB, H2, HB2D and the quad tree via [`HierarchicalEngine`]
//!
//! # Examples
//!
//! ## One-call estimate
//!
//! ```rust
//! use privhist_core::Domain;
//! use privhist_tree::estimate;
//!
//! let domain = Domain::one_d(&[12u32, 0, 3, 9, 4, 4, 0, 1, 7]).unwrap();
//! let noisy = estimate(&domain, 1.0, Some(42), None, None).unwrap();
//! assert_eq!(noisy.shape(), domain.shape());
//! ```
//!
//! ## Picking an estimator
//!
//! ```rust
//! use privhist_core::Domain;
//! use privhist_tree::{EstimationEngine, HierarchicalEngine};
//!
//! let rows: Vec<Vec<u32>> = (0..8).map(|r| (0..8).map(|c| r * c).collect()).collect();
//! let domain = Domain::two_d(&rows).unwrap();
//!
//! let quad = HierarchicalEngine::quadtree();
//! let report = quad.run_with_report(&domain, 0.5, Some(7)).unwrap();
//! report.tree.check_additivity(1e-9).unwrap();
//! println!("{}: arity {}, height {}", quad.name(), report.arity, report.height);
//! ```

pub mod branching;
pub mod budget;
pub mod builders;
pub mod config;
pub mod consistency;
pub mod engine;
pub mod injector;
pub mod traits;
pub mod types;

// Re-export main types
pub use branching::{choose_branching, choose_branching_2d, variance_1d, variance_2d};
pub use budget::{BudgetSchedule, BudgetScheduler};
pub use builders::TreeBuilder;
pub use config::{ArityChoice, ConsistencyMethod, HierarchyConfig};
pub use consistency::{MinimumVariance, WeightRule, WeightedMean};
pub use engine::{config_for, estimate, estimate_with_config, EstimationReport, HierarchicalEngine};
pub use injector::inject;
pub use traits::{ConsistencyAlgorithm, EstimationEngine};
pub use types::{HierarchicalTree, NodeId, Region, TreeNode};

// Re-export core types
pub use privhist_core::{Domain, Error, Grid, Result};
