//! Core types for differentially private histogram estimation
//!
//! This crate provides the pieces shared by every estimator in the privhist
//! workspace:
//!
//! - **Errors**: a single [`Error`] taxonomy and [`Result`] alias
//! - **Arrays**: [`Grid`] for estimates and [`Domain`] for validated true counts
//! - **Noise**: the [`NoiseSource`] capability and its deterministic
//!   [`SeededNoise`] implementation
//! - **Math**: exact integer logarithms used to size trees
//!
//! # Example
//!
//! ```rust
//! use privhist_core::{Domain, NoiseSource, SeededNoise};
//!
//! let domain = Domain::one_d(&[3u32, 0, 7, 1]).unwrap();
//! assert_eq!(domain.total(), 11.0);
//!
//! let mut noise = SeededNoise::new(1234);
//! let noisy = domain.total() + noise.laplace(1.0 / 0.5).unwrap();
//! println!("noisy total: {noisy:.2}");
//! ```

pub mod error;
pub mod grid;
pub mod math;
pub mod noise;

pub use error::{check_epsilon, require_seed, Error, Result};
pub use grid::{Domain, Grid};
pub use noise::{Laplace, NoiseSource, SeededNoise};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
