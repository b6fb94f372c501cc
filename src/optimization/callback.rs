//! Progress callbacks for observing and stopping a run.
//!
//! A callback observes each completed iteration read-only; it must not
//! (and cannot, through this interface) mutate the optimizer's state.
//! Returning `false` from [`ProgressCallback::on_iteration`] requests
//! an early stop, which the engine honors at the next iteration
//! boundary and reports as
//! [`TerminationReason::CallbackStopped`](crate::optimization::optimizer::TerminationReason).
//! Callbacks carry their own state; there is no global registration.

use crate::core::error::OptimizerResult;
use crate::core::space::VectorSpace;
use crate::core::types::Scalar;

/// Read-only view of one completed iteration.
#[derive(Debug)]
pub struct IterationInfo<'a, T: Scalar, V> {
    /// Index of the completed iteration, starting at 1.
    pub iteration: usize,

    /// Objective value at the new iterate.
    pub value: T,

    /// Global gradient norm at the new iterate.
    pub gradient_norm: T,

    /// The new iterate (this participant's shard in a sharded run).
    pub point: &'a V,
}

/// Observer invoked once per completed iteration.
pub trait ProgressCallback<T: Scalar, V: VectorSpace<T>> {
    /// Called once before the first iteration.
    fn on_start(&mut self) -> OptimizerResult<()> {
        Ok(())
    }

    /// Called after each completed iteration.
    ///
    /// Returns `true` to continue, `false` to request an early stop.
    fn on_iteration(&mut self, info: &IterationInfo<'_, T, V>) -> OptimizerResult<bool> {
        let _ = info;
        Ok(true)
    }

    /// Called once after the run has terminated, for any reason.
    fn on_finish(&mut self) -> OptimizerResult<()> {
        Ok(())
    }
}

/// A callback that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl<T: Scalar, V: VectorSpace<T>> ProgressCallback<T, V> for NoOpCallback {}

/// Prints `iteration  value  gradient-norm` lines to stdout.
///
/// In a sharded run, construct it only on the coordinator rank (or
/// accept interleaved output).
#[derive(Debug, Clone)]
pub struct PrintProgress {
    print_every: usize,
}

impl PrintProgress {
    /// Prints every `print_every`-th iteration.
    pub fn new(print_every: usize) -> Self {
        Self {
            print_every: print_every.max(1),
        }
    }
}

impl<T: Scalar, V: VectorSpace<T>> ProgressCallback<T, V> for PrintProgress {
    fn on_iteration(&mut self, info: &IterationInfo<'_, T, V>) -> OptimizerResult<bool> {
        if info.iteration % self.print_every == 0 {
            println!(
                "{}\t{}\t{}",
                info.iteration, info.value, info.gradient_norm
            );
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::comm::SingleProcess;
    use crate::core::space::ShardedVector;
    use std::sync::Arc;

    #[test]
    fn test_default_callback_continues() {
        let mut cb = NoOpCallback;
        let point =
            ShardedVector::<f64, _>::from_slice(&[1.0], Arc::new(SingleProcess::new())).unwrap();
        let info = IterationInfo {
            iteration: 1,
            value: 0.5,
            gradient_norm: 0.1,
            point: &point,
        };
        assert!(
            ProgressCallback::<f64, ShardedVector<f64, SingleProcess>>::on_start(&mut cb).is_ok()
        );
        assert!(cb.on_iteration(&info).unwrap());
        assert!(
            ProgressCallback::<f64, ShardedVector<f64, SingleProcess>>::on_finish(&mut cb).is_ok()
        );
    }
}
