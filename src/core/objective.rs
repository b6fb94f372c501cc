//! Objective adapter binding a [`CostFunction`] to a vector space.
//!
//! The engine manipulates [`VectorSpace`] values; the caller's
//! objective speaks plain slices. The adapter records the evaluation
//! point and translates between the two representations.

use crate::core::comm::Communicator;
use crate::core::cost_function::CostFunction;
use crate::core::error::Result;
use crate::core::space::{ShardedVector, VectorSpace};
use crate::core::types::{DVector, Scalar};

/// Engine-facing objective contract over a vector representation.
///
/// The adapter caches nothing beyond the last recorded point; when
/// both the value and the gradient are needed at the same point, the
/// caller is responsible for not interleaving another `set_point`.
/// An adapter is stateful and must not be shared between two engine
/// instances.
pub trait Objective<T: Scalar, V: VectorSpace<T>> {
    /// Records the evaluation point.
    fn set_point(&mut self, x: &V);

    /// Objective value at the last recorded point.
    ///
    /// May be expensive; the line search calls this once per trial.
    fn value(&mut self) -> Result<T>;

    /// Writes the gradient at the last recorded point into `out`.
    fn gradient(&mut self, out: &mut V) -> Result<()>;
}

/// Binds a slice-native [`CostFunction`] to [`ShardedVector`] points.
///
/// Keeps a copy of the local shard of the last set point and forwards
/// evaluation to the wrapped function.
#[derive(Debug)]
pub struct CostAdapter<T: Scalar, F> {
    inner: F,
    point: DVector<T>,
}

impl<T: Scalar, F: CostFunction<T>> CostAdapter<T, F> {
    /// Wraps `inner`, evaluating points of local dimension `local_dim`.
    pub fn new(inner: F, local_dim: usize) -> Self {
        Self {
            inner,
            point: DVector::zeros(local_dim),
        }
    }

    /// The wrapped cost function.
    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<T, F, C> Objective<T, ShardedVector<T, C>> for CostAdapter<T, F>
where
    T: Scalar,
    F: CostFunction<T>,
    C: Communicator<T>,
{
    fn set_point(&mut self, x: &ShardedVector<T, C>) {
        self.point.as_mut_slice().copy_from_slice(x.local());
    }

    fn value(&mut self) -> Result<T> {
        self.inner.cost(self.point.as_slice())
    }

    fn gradient(&mut self, out: &mut ShardedVector<T, C>) -> Result<()> {
        self.inner.gradient(self.point.as_slice(), out.local_mut())
    }
}
