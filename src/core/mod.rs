//! Core value types: scalars, errors, collectives, vector spaces, and
//! objective adapters.

pub mod comm;
pub mod cost_function;
pub mod error;
pub mod objective;
pub mod space;
pub mod types;

pub use comm::{Communicator, SingleProcess, ThreadGroup};
pub use cost_function::{CostFunction, FnCost, QuadraticCost};
pub use error::{CoreError, OptimizerError, OptimizerResult, Result};
pub use objective::{CostAdapter, Objective};
pub use space::{ShardedVector, ShardedVectorFactory, VectorFactory, VectorSpace};
pub use types::{DVector, Scalar};
