//! Step-length selection along a search direction.
//!
//! The engine asks a line search for a step `α > 0` along a descent
//! direction `d` such that `f(x + α d)` decreases sufficiently. The
//! implementation here is backtracking under the Armijo condition
//!
//! ```text
//! f(x + α d) <= f(x) + c₁ α (g · d)
//! ```
//!
//! starting from `α₀` and shrinking geometrically on rejection, with a
//! bounded number of trials. Exhausting the budget is reported as an
//! unsuccessful outcome — never as silent acceptance of a
//! non-decreasing step — and the engine surfaces it as a distinct
//! termination reason.
//!
//! Every trial evaluates the objective exactly once and performs no
//! collective operations of its own, so all participants of a sharded
//! run walk through identical trial sequences in lockstep.

use crate::core::error::{OptimizerError, OptimizerResult, Result};
use crate::core::objective::Objective;
use crate::core::space::VectorSpace;
use crate::core::types::Scalar;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tuning parameters for the backtracking search.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineSearchParams<T: Scalar> {
    /// First step length tried, `α₀`.
    pub initial_step_size: T,

    /// Sufficient-decrease constant `c₁ ∈ (0, 1)`.
    pub c1: T,

    /// Geometric shrink factor `∈ (0, 1)` applied after a rejection.
    pub shrink: T,

    /// Step lengths below this abort the search.
    pub min_step_size: T,

    /// Maximum number of trial evaluations.
    pub max_trials: usize,
}

impl<T: Scalar> Default for LineSearchParams<T> {
    fn default() -> Self {
        Self {
            initial_step_size: T::one(),
            c1: <T as Scalar>::from_f64(1e-4),
            shrink: <T as Scalar>::from_f64(0.5),
            min_step_size: T::MIN_STEP_SIZE,
            max_trials: 60,
        }
    }
}

impl<T: Scalar> LineSearchParams<T> {
    /// Validates the parameters against their mathematical ranges.
    pub fn validate(&self) -> OptimizerResult<()> {
        if self.initial_step_size <= T::zero() {
            return Err(OptimizerError::invalid_configuration(
                "must be positive",
                "initial_step_size",
                format!("{}", self.initial_step_size),
            ));
        }
        if self.c1 <= T::zero() || self.c1 >= T::one() {
            return Err(OptimizerError::invalid_configuration(
                "must be in (0, 1)",
                "c1",
                format!("{}", self.c1),
            ));
        }
        if self.shrink <= T::zero() || self.shrink >= T::one() {
            return Err(OptimizerError::invalid_configuration(
                "must be in (0, 1)",
                "shrink",
                format!("{}", self.shrink),
            ));
        }
        if self.min_step_size <= T::zero() {
            return Err(OptimizerError::invalid_configuration(
                "must be positive",
                "min_step_size",
                format!("{}", self.min_step_size),
            ));
        }
        if self.max_trials == 0 {
            return Err(OptimizerError::invalid_configuration(
                "must be at least 1",
                "max_trials",
                "0",
            ));
        }
        Ok(())
    }
}

/// Outcome of one line search.
#[derive(Debug, Clone, Copy)]
pub struct LineSearchOutcome<T: Scalar> {
    /// Accepted step length (last tried length when unsuccessful).
    pub step_size: T,

    /// Objective value at the accepted point (meaningless when
    /// `success` is false).
    pub new_value: T,

    /// Objective evaluations spent.
    pub function_evals: usize,

    /// True when a step satisfying sufficient decrease was found.
    pub success: bool,
}

/// Interface for step-length selection strategies.
pub trait LineSearch<T: Scalar> {
    /// Searches along `direction` from `x`.
    ///
    /// `value` is `f(x)` and `directional_deriv` is `g · d`, both
    /// already globally consistent. On success, `trial` holds the
    /// accepted point and the adapter's recorded point is the accepted
    /// point as well.
    #[allow(clippy::too_many_arguments)]
    fn search<V, O>(
        &mut self,
        objective: &mut O,
        x: &V,
        value: T,
        direction: &V,
        directional_deriv: T,
        trial: &mut V,
        params: &LineSearchParams<T>,
    ) -> Result<LineSearchOutcome<T>>
    where
        V: VectorSpace<T>,
        O: Objective<T, V>;

    /// Human-readable strategy name.
    fn name(&self) -> &str;
}

/// Backtracking line search with the Armijo sufficient-decrease
/// condition.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktrackingLineSearch;

impl BacktrackingLineSearch {
    /// Creates the strategy.
    pub fn new() -> Self {
        Self
    }
}

impl<T: Scalar> LineSearch<T> for BacktrackingLineSearch {
    fn search<V, O>(
        &mut self,
        objective: &mut O,
        x: &V,
        value: T,
        direction: &V,
        directional_deriv: T,
        trial: &mut V,
        params: &LineSearchParams<T>,
    ) -> Result<LineSearchOutcome<T>>
    where
        V: VectorSpace<T>,
        O: Objective<T, V>,
    {
        // The engine only hands over descent directions; a
        // non-negative slope cannot satisfy Armijo for any α > 0.
        if directional_deriv >= T::zero() {
            return Ok(LineSearchOutcome {
                step_size: T::zero(),
                new_value: value,
                function_evals: 0,
                success: false,
            });
        }

        let mut alpha = params.initial_step_size;
        let mut function_evals = 0;

        for _ in 0..params.max_trials {
            trial.copy_scaled(x, T::one())?;
            trial.axpy(alpha, direction)?;
            objective.set_point(trial);
            let trial_value = objective.value()?;
            function_evals += 1;

            if trial_value <= value + params.c1 * alpha * directional_deriv {
                return Ok(LineSearchOutcome {
                    step_size: alpha,
                    new_value: trial_value,
                    function_evals,
                    success: true,
                });
            }

            alpha *= params.shrink;
            if alpha < params.min_step_size {
                break;
            }
        }

        Ok(LineSearchOutcome {
            step_size: alpha,
            new_value: value,
            function_evals,
            success: false,
        })
    }

    fn name(&self) -> &str {
        "Backtracking"
    }
}
