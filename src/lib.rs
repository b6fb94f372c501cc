//! Limited-memory quasi-Newton optimization over sharded vectors.
//!
//! `shardopt` minimizes smooth unconstrained objectives with L-BFGS,
//! expressed entirely against a small vector-space abstraction. The
//! same engine code drives two deployments:
//!
//! - **In-memory**: one process owns the whole parameter vector and
//!   the collective operations degenerate to identity (see
//!   [`SingleProcess`](core::comm::SingleProcess)).
//! - **Sharded SPMD**: each participant owns a contiguous shard of the
//!   logical vector and runs the identical iteration logic in
//!   lockstep; norms and dot products reduce local contributions
//!   through a [`Communicator`](core::comm::Communicator) and
//!   redistribute the scalar so every participant branches the same
//!   way.
//!
//! # Architecture
//!
//! - [`core`]: scalar traits, error types, collectives, the
//!   [`VectorSpace`](core::space::VectorSpace) /
//!   [`VectorFactory`](core::space::VectorFactory) abstraction, and
//!   the objective adapters.
//! - [`optimization`]: the [`Lbfgs`](optimization::lbfgs::Lbfgs)
//!   engine, its backtracking line search, stopping criteria, and
//!   progress callbacks.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use shardopt::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let comm = Arc::new(SingleProcess::new());
//! let factory = ShardedVectorFactory::new(2, Arc::clone(&comm))?;
//!
//! // f(x) = (x0 - 1)^2 / 2 + (x1 + 2)^2 / 2
//! let cost = QuadraticCost::new(vec![1.0, -2.0], vec![1.0, 1.0])?;
//! let mut objective = CostAdapter::new(cost, 2);
//!
//! let mut engine = Lbfgs::new(factory, LbfgsConfig::default())?;
//! engine.set_starting(&ShardedVector::from_slice(&[10.0, 10.0], comm)?)?;
//!
//! let criterion = StoppingCriterion::new().with_gradient_tolerance(1e-8);
//! let result = engine.minimize(&mut objective, &criterion)?;
//!
//! assert!(result.converged);
//! assert!(result.value < 1e-10);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod optimization;

pub use crate::core::{
    Communicator, CoreError, CostAdapter, CostFunction, FnCost, Objective, OptimizerError,
    OptimizerResult, QuadraticCost, Result, Scalar, ShardedVector, ShardedVectorFactory,
    SingleProcess, ThreadGroup, VectorFactory, VectorSpace,
};
pub use crate::optimization::{
    Lbfgs, LbfgsConfig, OptimizationResult, StoppingCriterion, TerminationReason,
};

/// Convenience re-exports for typical use.
pub mod prelude {
    pub use crate::core::{
        Communicator, CostAdapter, CostFunction, FnCost, Objective, QuadraticCost, ShardedVector,
        ShardedVectorFactory, SingleProcess, ThreadGroup, VectorFactory, VectorSpace,
    };
    pub use crate::optimization::{
        IterationInfo, Lbfgs, LbfgsConfig, LineSearchParams, NoOpCallback, OptimizationResult,
        PrintProgress, ProgressCallback, StoppingCriterion, TerminationReason,
    };
}
