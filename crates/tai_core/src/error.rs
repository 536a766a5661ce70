//! Typed failures of the reduction utilities and the RKF45 integrator.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReductionError {
    #[error("Cannot reduce an empty {rows}x{cols} table.")]
    EmptyTable { rows: usize, cols: usize },
    #[error("Reduction axis must be 1 (rows) or 2 (columns), got {0}.")]
    InvalidAxis(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    /// No candidate satisfied the error tolerances and the negativity guard
    /// within the iteration cap. Output buffers hold no meaningful result.
    #[error("Step size control did not converge in {iterations} iterations (last step {last_step:e}).")]
    StepIterationExhausted { iterations: usize, last_step: f64 },
    #[error("State shape mismatch: expected {expected:?}, got {actual:?}.")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("Expected {expected} absolute tolerances, got {actual}.")]
    ToleranceLength { expected: usize, actual: usize },
    #[error("Absolute tolerance for variable {index} must be positive, got {value}.")]
    NonPositiveTolerance { index: usize, value: f64 },
    #[error("Step size must be positive and finite, got {0}.")]
    NonPositiveStep(f64),
    #[error(transparent)]
    Reduction(#[from] ReductionError),
}
