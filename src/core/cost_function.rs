//! Caller-facing objective function interface.
//!
//! A [`CostFunction`] maps a point, given as a plain slice of reals,
//! to a scalar objective value and its exact gradient. Implementations
//! must be deterministic for a fixed point; the optimizer relies on
//! this for reproducible convergence behavior.
//!
//! In a sharded run each participant's implementation receives only
//! its local shard, but `cost` must return the globally consistent
//! value on every rank (reducing partial sums through the run's
//! communicator internally). The gradient written by `gradient` is the
//! local shard of the global gradient.

use crate::core::error::{CoreError, Result};
use crate::core::types::Scalar;

/// A scalar objective together with its exact gradient.
pub trait CostFunction<T: Scalar> {
    /// Evaluates the objective at `point`.
    fn cost(&self, point: &[T]) -> Result<T>;

    /// Writes the gradient at `point` into `grad`.
    ///
    /// `grad` has the same length as `point`.
    fn gradient(&self, point: &[T], grad: &mut [T]) -> Result<()>;
}

/// Adapts a pair of closures into a [`CostFunction`].
///
/// The closures capture whatever context they need; no global state is
/// involved, so independent optimizer instances can run concurrently
/// over different `FnCost` values.
pub struct FnCost<F, G> {
    cost: F,
    gradient: G,
}

impl<F, G> FnCost<F, G> {
    /// Wraps `cost` and `gradient` closures.
    pub fn new(cost: F, gradient: G) -> Self {
        Self { cost, gradient }
    }
}

impl<T, F, G> CostFunction<T> for FnCost<F, G>
where
    T: Scalar,
    F: Fn(&[T]) -> Result<T>,
    G: Fn(&[T], &mut [T]) -> Result<()>,
{
    fn cost(&self, point: &[T]) -> Result<T> {
        (self.cost)(point)
    }

    fn gradient(&self, point: &[T], grad: &mut [T]) -> Result<()> {
        (self.gradient)(point, grad)
    }
}

/// Separable diagonal quadratic `f(x) = Σ (x_i - t_i)^2 / (2 w_i^2)`.
///
/// Strictly convex with unique minimizer `t`; its Hessian is the
/// diagonal `1 / w_i^2`. Mostly useful for tests and as a reference
/// implementation of the [`CostFunction`] contract.
#[derive(Debug, Clone)]
pub struct QuadraticCost<T> {
    target: Vec<T>,
    weights: Vec<T>,
}

impl<T: Scalar> QuadraticCost<T> {
    /// Creates the quadratic with minimizer `target` and per-component
    /// curvature scales `weights` (each `w_i` must be nonzero).
    pub fn new(target: Vec<T>, weights: Vec<T>) -> Result<Self> {
        if target.is_empty() || target.len() != weights.len() {
            return Err(CoreError::dimension_mismatch(target.len(), weights.len()));
        }
        if weights.iter().any(|w| *w == T::zero()) {
            return Err(CoreError::evaluation("curvature scale must be nonzero"));
        }
        Ok(Self { target, weights })
    }

    /// Isotropic quadratic `f(x) = ||x||^2 / 2` in `n` dimensions.
    pub fn isotropic(n: usize) -> Result<Self> {
        Self::new(vec![T::zero(); n], vec![T::one(); n])
    }

    fn check_dimension(&self, point: &[T]) -> Result<()> {
        if point.len() != self.target.len() {
            return Err(CoreError::dimension_mismatch(self.target.len(), point.len()));
        }
        Ok(())
    }
}

impl<T: Scalar> CostFunction<T> for QuadraticCost<T> {
    fn cost(&self, point: &[T]) -> Result<T> {
        self.check_dimension(point)?;
        let two = <T as Scalar>::from_f64(2.0);
        let mut sum = T::zero();
        for ((x, t), w) in point.iter().zip(&self.target).zip(&self.weights) {
            let r = *x - *t;
            sum += r * r / (two * *w * *w);
        }
        Ok(sum)
    }

    fn gradient(&self, point: &[T], grad: &mut [T]) -> Result<()> {
        self.check_dimension(point)?;
        if grad.len() != point.len() {
            return Err(CoreError::dimension_mismatch(point.len(), grad.len()));
        }
        for (g, ((x, t), w)) in grad
            .iter_mut()
            .zip(point.iter().zip(&self.target).zip(&self.weights))
        {
            *g = (*x - *t) / (*w * *w);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quadratic_cost_value_and_gradient() {
        let cost = QuadraticCost::new(vec![1.0, -2.0], vec![1.0, 2.0]).unwrap();

        // f(x) = (x0 - 1)^2 / 2 + (x1 + 2)^2 / 8
        assert_relative_eq!(cost.cost(&[3.0, 2.0]).unwrap(), 2.0 + 2.0);

        let mut grad = [0.0; 2];
        cost.gradient(&[3.0, 2.0], &mut grad).unwrap();
        assert_relative_eq!(grad[0], 2.0);
        assert_relative_eq!(grad[1], 1.0);
    }

    #[test]
    fn test_quadratic_minimum_is_target() {
        let cost = QuadraticCost::new(vec![0.5, 1.5], vec![1.0, 1.0]).unwrap();
        assert_relative_eq!(cost.cost(&[0.5, 1.5]).unwrap(), 0.0);

        let mut grad = [1.0; 2];
        cost.gradient(&[0.5, 1.5], &mut grad).unwrap();
        assert_relative_eq!(grad[0], 0.0);
        assert_relative_eq!(grad[1], 0.0);
    }

    #[test]
    fn test_quadratic_rejects_bad_shapes() {
        assert!(QuadraticCost::<f64>::new(vec![], vec![]).is_err());
        assert!(QuadraticCost::new(vec![1.0], vec![1.0, 2.0]).is_err());
        assert!(QuadraticCost::new(vec![1.0], vec![0.0]).is_err());

        let cost = QuadraticCost::new(vec![1.0], vec![1.0]).unwrap();
        assert!(cost.cost(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_fn_cost_wrapper() {
        let f = FnCost::new(
            |x: &[f64]| Ok(x[0] * x[0]),
            |x: &[f64], g: &mut [f64]| {
                g[0] = 2.0 * x[0];
                Ok(())
            },
        );
        assert_eq!(f.cost(&[3.0]).unwrap(), 9.0);
        let mut g = [0.0];
        f.gradient(&[3.0], &mut g).unwrap();
        assert_eq!(g[0], 6.0);
    }
}
