//! Error types for vector-space and optimizer operations.
//!
//! Structural precondition violations (zero dimensions, mismatched
//! shard lengths, invalid configuration) are surfaced as errors at the
//! call site that detected them and are never silently corrected.
//! Recoverable numerical conditions (curvature rejection, degenerate
//! first-iteration direction) are handled inside the iteration loop
//! and do not appear here.

use thiserror::Error;

/// Errors raised by vector-space primitives and objective evaluation.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// Two vectors with different local shard lengths met in a
    /// binary operation.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected local dimension.
        expected: usize,
        /// Actual local dimension.
        actual: usize,
    },

    /// A vector or factory was requested with a zero dimension.
    #[error("Invalid dimension: {reason}")]
    InvalidDimension {
        /// Description of the invalid request.
        reason: String,
    },

    /// The caller-supplied objective or gradient function failed.
    ///
    /// The core performs no retry of user-function failures; the
    /// error is propagated unchanged to the optimizer's caller.
    #[error("Objective evaluation failed: {reason}")]
    Evaluation {
        /// Description of the evaluation failure.
        reason: String,
    },
}

impl CoreError {
    /// Create a `DimensionMismatch` error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create an `InvalidDimension` error with a custom reason.
    pub fn invalid_dimension<S: Into<String>>(reason: S) -> Self {
        Self::InvalidDimension {
            reason: reason.into(),
        }
    }

    /// Create an `Evaluation` error with a custom reason.
    pub fn evaluation<S: Into<String>>(reason: S) -> Self {
        Self::Evaluation {
            reason: reason.into(),
        }
    }
}

/// Errors raised by the optimization layer.
#[derive(Debug, Clone, Error)]
pub enum OptimizerError {
    /// The optimizer or line search was configured with invalid
    /// parameters (e.g. zero history size, `c1` outside `(0, 1)`).
    #[error("Invalid optimizer configuration: {reason} (parameter `{parameter}` = {value})")]
    InvalidConfiguration {
        /// Description of the configuration error.
        reason: String,
        /// Name of the invalid parameter.
        parameter: String,
        /// Value that was rejected.
        value: String,
    },

    /// Propagated vector-space or evaluation error.
    #[error("Core operation failed: {0}")]
    Core(#[from] CoreError),
}

impl OptimizerError {
    /// Create an `InvalidConfiguration` error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }
}

/// Result type alias for vector-space operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Result type alias for optimizer operations.
pub type OptimizerResult<T> = std::result::Result<T, OptimizerError>;
