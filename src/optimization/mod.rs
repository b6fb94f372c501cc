//! Optimization algorithms and their control surface.

pub mod callback;
pub mod lbfgs;
pub mod line_search;
pub mod optimizer;

pub use callback::{IterationInfo, NoOpCallback, PrintProgress, ProgressCallback};
pub use lbfgs::{Lbfgs, LbfgsConfig};
pub use line_search::{BacktrackingLineSearch, LineSearch, LineSearchOutcome, LineSearchParams};
pub use optimizer::{OptimizationResult, StoppingCriterion, TerminationReason};
