//! Stopping criteria, termination reasons, and run results.
//!
//! These types form the convergence-control surface shared by the
//! optimization algorithms: a [`StoppingCriterion`] describes when a
//! run should end, a [`TerminationReason`] records why it did, and an
//! [`OptimizationResult`] carries the final iterate together with
//! convergence diagnostics and computational statistics.

use crate::core::types::Scalar;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why an optimization run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminationReason {
    /// Gradient norm below tolerance, or function-value change
    /// stagnated below the relative tolerance.
    Converged,
    /// Iteration budget exhausted without convergence.
    MaxIterations,
    /// The line search found no acceptable step within its retry
    /// budget. The result carries the last point that did satisfy
    /// sufficient decrease, never a silently accepted stale step.
    LineSearchFailed,
    /// The progress callback requested an early stop.
    CallbackStopped,
}

/// Convergence and budget conditions for a run.
///
/// Both tolerance checks are always active: the gradient-norm test is
/// evaluated at the top of every iteration and the relative
/// function-change test after every accepted step. Defaults follow
/// the conventional `minimize` signature of this engine's lineage:
/// function tolerance `1e-3`, gradient tolerance `1e-5`, iteration cap
/// `1_000_000`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StoppingCriterion<T: Scalar> {
    /// Maximum number of major iterations.
    pub max_iterations: usize,

    /// Terminate once the global gradient norm is at or below this.
    pub gradient_tolerance: T,

    /// Terminate once the function-value decrease over one iteration
    /// falls below this, relative to the value magnitude.
    pub function_tolerance: T,
}

impl<T: Scalar> Default for StoppingCriterion<T> {
    fn default() -> Self {
        Self {
            max_iterations: 1_000_000,
            gradient_tolerance: T::DEFAULT_GRADIENT_TOLERANCE,
            function_tolerance: T::DEFAULT_FUNCTION_TOLERANCE,
        }
    }
}

impl<T: Scalar> StoppingCriterion<T> {
    /// Creates a criterion with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the iteration cap.
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Sets the gradient-norm tolerance.
    pub fn with_gradient_tolerance(mut self, tol: T) -> Self {
        self.gradient_tolerance = tol;
        self
    }

    /// Sets the relative function-change tolerance.
    pub fn with_function_tolerance(mut self, tol: T) -> Self {
        self.function_tolerance = tol;
        self
    }
}

/// Outcome of an optimization run.
///
/// In a sharded run, `point` holds this participant's shard of the
/// final iterate while the scalar diagnostics (`value`,
/// `gradient_norm`) are globally consistent on every participant.
#[derive(Debug, Clone)]
pub struct OptimizationResult<T: Scalar, V> {
    /// The final iterate.
    pub point: V,

    /// Objective value at the final iterate.
    pub value: T,

    /// Global gradient norm at the final iterate.
    pub gradient_norm: T,

    /// Number of completed major iterations.
    pub iterations: usize,

    /// Total objective evaluations, including line-search trials.
    pub function_evaluations: usize,

    /// Total gradient evaluations.
    pub gradient_evaluations: usize,

    /// Wall-clock time of the run.
    pub duration: Duration,

    /// Why the run ended.
    pub termination_reason: TerminationReason,

    /// True when `termination_reason` is [`TerminationReason::Converged`].
    pub converged: bool,
}

impl<T: Scalar, V> OptimizationResult<T, V> {
    /// Creates a result; `converged` is derived from the reason.
    pub fn new(
        point: V,
        value: T,
        gradient_norm: T,
        iterations: usize,
        duration: Duration,
        termination_reason: TerminationReason,
    ) -> Self {
        let converged = matches!(termination_reason, TerminationReason::Converged);
        Self {
            point,
            value,
            gradient_norm,
            iterations,
            function_evaluations: 0,
            gradient_evaluations: 0,
            duration,
            termination_reason,
            converged,
        }
    }

    /// Sets the objective evaluation count.
    pub fn with_function_evaluations(mut self, count: usize) -> Self {
        self.function_evaluations = count;
        self
    }

    /// Sets the gradient evaluation count.
    pub fn with_gradient_evaluations(mut self, count: usize) -> Self {
        self.gradient_evaluations = count;
        self
    }
}
