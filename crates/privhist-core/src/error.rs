//! Error types for private histogram estimation
//!
//! Provides a unified error type for all privhist crates.

use thiserror::Error;

/// Core error type for private histogram operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter provided to a function
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Insufficient data for the requested operation
    #[error("Insufficient data: expected at least {expected} cells, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// A structural invariant of the hierarchy was broken
    ///
    /// This always points at a defect in tree construction or inference and
    /// must never be ignored by callers.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Numerical computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for empty input
    pub fn empty_input(_operation: &str) -> Self {
        Self::InsufficientData {
            expected: 1,
            actual: 0,
        }
    }

    /// Create an error for an input whose dimensionality the caller cannot handle
    pub fn dimension_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::InvalidInput(format!(
            "{context} is defined for {expected}D data only, got {actual}D"
        ))
    }

    /// Create an error for size mismatch
    pub fn size_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::InvalidInput(format!(
            "Size mismatch in {context}: expected {expected}, got {actual}"
        ))
    }

    /// Create an error for NaN/Inf values
    pub fn non_finite(context: &str) -> Self {
        Self::Computation(format!("{context} contains NaN or infinite values"))
    }
}

/// Validate a total privacy budget
pub fn check_epsilon(epsilon: f64) -> Result<()> {
    if !epsilon.is_finite() || epsilon <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "epsilon must be positive and finite, got {epsilon}"
        )));
    }
    Ok(())
}

/// Unwrap a caller supplied seed, rejecting a missing one
pub fn require_seed(seed: Option<u64>) -> Result<u64> {
    seed.ok_or_else(|| Error::InvalidInput("seed must be set".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidParameter("arity must be at least 2".to_string());
        assert_eq!(err.to_string(), "Invalid parameter: arity must be at least 2");

        let err = Error::InvalidInput("negative count".to_string());
        assert_eq!(err.to_string(), "Invalid input: negative count");

        let err = Error::InsufficientData { expected: 2, actual: 1 };
        assert_eq!(err.to_string(), "Insufficient data: expected at least 2 cells, got 1");

        let err = Error::InvariantViolation("leaf 3 never visited".to_string());
        assert_eq!(err.to_string(), "Invariant violation: leaf 3 never visited");

        let err = Error::Computation("overflow".to_string());
        assert_eq!(err.to_string(), "Computation error: overflow");
    }

    #[test]
    fn test_error_helper_functions() {
        match Error::empty_input("tree construction") {
            Error::InsufficientData { expected, actual } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 0);
            }
            _ => panic!("Wrong error type"),
        }

        let err = Error::dimension_mismatch(2, 1, "HB2D");
        assert_eq!(err.to_string(), "Invalid input: HB2D is defined for 2D data only, got 1D");
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = Error::size_mismatch(16, 15, "domain values");
        assert_eq!(err.to_string(), "Invalid input: Size mismatch in domain values: expected 16, got 15");

        let err = Error::non_finite("noisy counts");
        assert_eq!(err.to_string(), "Computation error: noisy counts contains NaN or infinite values");
    }

    #[test]
    fn test_check_epsilon() {
        assert!(check_epsilon(0.1).is_ok());
        assert!(check_epsilon(1e6).is_ok());
        assert!(matches!(check_epsilon(0.0), Err(Error::InvalidInput(_))));
        assert!(check_epsilon(-1.0).is_err());
        assert!(check_epsilon(f64::NAN).is_err());
        assert!(check_epsilon(f64::INFINITY).is_err());
    }

    #[test]
    fn test_require_seed() {
        assert_eq!(require_seed(Some(7)).unwrap(), 7);
        let err = require_seed(None).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: seed must be set");
    }
}
