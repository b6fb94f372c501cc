//! Type definitions and aliases for the optimizer.
//!
//! This module provides the scalar trait bound used throughout the
//! library together with common type aliases and numerical constants.

use nalgebra::{OVector, Dyn, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used in optimization (f32 or f64).
///
/// Combines the numeric traits the algorithms need so that generic
/// code can be written once for both precisions.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Default tolerance for relative function-value stagnation.
    const DEFAULT_FUNCTION_TOLERANCE: Self;

    /// Default tolerance for gradient-norm convergence.
    const DEFAULT_GRADIENT_TOLERANCE: Self;

    /// Smallest step length a line search will try before giving up.
    const MIN_STEP_SIZE: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_from_f64` for a
    /// non-panicking version.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Try to convert from f64.
    fn try_from_f64(v: f64) -> Option<Self> {
        <Self as FromPrimitive>::from_f64(v)
    }

    /// Convert to f64 (for reporting/display).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_to_f64` for a
    /// non-panicking version.
    fn to_f64(self) -> f64 {
        num_traits::cast(self).expect("Failed to convert to f64")
    }

    /// Try to convert to f64.
    fn try_to_f64(self) -> Option<f64> {
        num_traits::cast(self)
    }

    /// Convert from usize (for iteration counts and dimensions).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).expect("Failed to convert from usize")
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const DEFAULT_FUNCTION_TOLERANCE: Self = 1e-3;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-4;
    const MIN_STEP_SIZE: Self = 1e-10;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const DEFAULT_FUNCTION_TOLERANCE: Self = 1e-3;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-5;
    const MIN_STEP_SIZE: Self = 1e-16;
}

/// Type alias for a dynamically-sized column vector.
pub type DVector<T> = OVector<T, Dyn>;
