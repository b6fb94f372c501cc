//! Limited-memory BFGS over an abstract vector space.
//!
//! The engine keeps a bounded window of recent curvature pairs
//! `(s_k, y_k, ρ_k)` and produces each search direction with the
//! classic two-loop recursion, seeded with the scaling
//! `γ = (s·y) / (y·y)` of the newest pair. Pairs that fail the
//! curvature condition `y·s > 0` are discarded rather than stored, so
//! the implicit inverse-Hessian approximation stays positive definite.
//!
//! All vector arithmetic goes through [`VectorSpace`], which is the
//! only seam touching data layout: the identical iteration logic
//! drives an in-memory vector or one shard of a distributed vector.
//! Every scalar that feeds a branch (norms, dot products, objective
//! values) is globally consistent before use, so all participants of a
//! sharded run take the same branch at every decision point.

use crate::core::error::{OptimizerError, OptimizerResult, Result};
use crate::core::objective::Objective;
use crate::core::space::{VectorFactory, VectorSpace};
use crate::core::types::Scalar;
use crate::optimization::callback::{IterationInfo, NoOpCallback, ProgressCallback};
use crate::optimization::line_search::{BacktrackingLineSearch, LineSearch, LineSearchParams};
use crate::optimization::optimizer::{OptimizationResult, StoppingCriterion, TerminationReason};
use num_traits::Float;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;

/// Configuration for the L-BFGS engine.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LbfgsConfig<T: Scalar> {
    /// Number of curvature pairs retained, `m >= 1`.
    pub memory_size: usize,

    /// Parameters of the backtracking line search.
    pub line_search: LineSearchParams<T>,
}

impl<T: Scalar> Default for LbfgsConfig<T> {
    fn default() -> Self {
        Self {
            memory_size: 10,
            line_search: LineSearchParams::default(),
        }
    }
}

impl<T: Scalar> LbfgsConfig<T> {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the history window size.
    pub fn with_memory_size(mut self, m: usize) -> Self {
        self.memory_size = m;
        self
    }

    /// Sets the line search parameters.
    pub fn with_line_search(mut self, params: LineSearchParams<T>) -> Self {
        self.line_search = params;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> OptimizerResult<()> {
        if self.memory_size == 0 {
            return Err(OptimizerError::invalid_configuration(
                "must be at least 1",
                "memory_size",
                "0",
            ));
        }
        self.line_search.validate()
    }
}

/// One retained curvature observation.
///
/// `s` is a step `x_{k+1} - x_k`, `y` the gradient difference
/// `g_{k+1} - g_k`, and `rho = 1 / (y·s)` with `y·s > 0` guaranteed at
/// insertion.
#[derive(Debug)]
struct CurvaturePair<T, V> {
    s: V,
    y: V,
    rho: T,
}

/// Bounded FIFO of curvature pairs with buffer recycling.
///
/// Evicted and rejected pair buffers return to a pool instead of being
/// dropped, so a long run allocates at most `capacity + 1` pairs of
/// vectors regardless of iteration count.
#[derive(Debug)]
struct History<T, V> {
    pairs: VecDeque<CurvaturePair<T, V>>,
    pool: Vec<(V, V)>,
    capacity: usize,
}

impl<T: Scalar, V: VectorSpace<T>> History<T, V> {
    fn new(capacity: usize) -> Self {
        Self {
            pairs: VecDeque::with_capacity(capacity),
            pool: Vec::new(),
            capacity,
        }
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }

    fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Hands out a pair of scratch vectors, recycling pooled buffers
    /// before asking the factory for fresh ones.
    fn take_buffers<F>(&mut self, factory: &F) -> (V, V)
    where
        F: VectorFactory<T, Vector = V>,
    {
        self.pool
            .pop()
            .unwrap_or_else(|| (factory.create(), factory.create()))
    }

    /// Returns unused scratch buffers to the pool.
    fn recycle(&mut self, s: V, y: V) {
        self.pool.push((s, y));
    }

    /// Appends a pair, evicting the oldest once at capacity.
    fn push(&mut self, s: V, y: V, rho: T) {
        if self.pairs.len() == self.capacity {
            if let Some(oldest) = self.pairs.pop_front() {
                self.pool.push((oldest.s, oldest.y));
            }
        }
        self.pairs.push_back(CurvaturePair { s, y, rho });
    }

    /// Discards all pairs, keeping their buffers for reuse.
    fn clear(&mut self) {
        while let Some(pair) = self.pairs.pop_front() {
            self.pool.push((pair.s, pair.y));
        }
    }

    /// Two-loop recursion: writes the quasi-Newton descent direction
    /// `d = -H_k g` into `d`, using `q` as scratch and `alpha` as the
    /// per-pair coefficient store.
    ///
    /// With an empty history this degenerates to steepest descent.
    fn compute_direction(&self, g: &V, q: &mut V, d: &mut V, alpha: &mut Vec<T>) -> Result<()> {
        if self.is_empty() {
            d.copy_scaled(g, -T::one())?;
            return Ok(());
        }

        // Seeding with -g makes the recursion produce -H g directly;
        // the recursion is linear and homogeneous in its seed.
        q.copy_scaled(g, -T::one())?;
        alpha.clear();
        alpha.resize(self.pairs.len(), T::zero());

        for (i, pair) in self.pairs.iter().enumerate().rev() {
            let a = pair.rho * pair.s.dot(q)?;
            q.axpy(-a, &pair.y)?;
            alpha[i] = a;
        }

        // Initial Hessian scaling from the newest pair:
        // γ = (s·y) / (y·y), with s·y recovered from the stored ρ.
        let mut gamma = T::one();
        if let Some(newest) = self.pairs.back() {
            let yy = newest.y.dot(&newest.y)?;
            if yy > T::zero() {
                gamma = T::one() / (newest.rho * yy);
            }
        }
        d.copy_scaled(q, gamma)?;

        for (i, pair) in self.pairs.iter().enumerate() {
            let beta = pair.rho * pair.y.dot(d)?;
            d.axpy(alpha[i] - beta, &pair.s)?;
        }
        Ok(())
    }
}

/// Limited-memory BFGS minimizer.
///
/// The engine owns the current iterate and its curvature history; the
/// factory supplies every work buffer, so the engine itself never
/// assumes a storage layout. A single instance can run several
/// minimizations in sequence via [`Lbfgs::set_starting`], reusing its
/// allocations.
pub struct Lbfgs<T: Scalar, F: VectorFactory<T>> {
    config: LbfgsConfig<T>,
    factory: F,
    line_search: BacktrackingLineSearch,
    history: History<T, F::Vector>,
    x: F::Vector,
}

impl<T, F> Lbfgs<T, F>
where
    T: Scalar,
    F: VectorFactory<T>,
{
    /// Creates an engine with the iterate initialized to zero.
    pub fn new(factory: F, config: LbfgsConfig<T>) -> OptimizerResult<Self> {
        config.validate()?;
        let x = factory.create();
        let history = History::new(config.memory_size);
        Ok(Self {
            config,
            factory,
            line_search: BacktrackingLineSearch::new(),
            history,
            x,
        })
    }

    /// The engine's configuration.
    pub fn config(&self) -> &LbfgsConfig<T> {
        &self.config
    }

    /// Algorithm name for diagnostics.
    pub fn name(&self) -> &str {
        "L-BFGS"
    }

    /// The current iterate (this participant's shard).
    pub fn point(&self) -> &F::Vector {
        &self.x
    }

    /// Resets the iterate to `x0` and discards the curvature history.
    ///
    /// Two runs from the same starting point produce identical iterate
    /// sequences; the reset leaves no state behind beyond recycled
    /// buffer allocations.
    pub fn set_starting(&mut self, x0: &F::Vector) -> Result<()> {
        self.x.copy_scaled(x0, T::one())?;
        self.history.clear();
        Ok(())
    }

    /// Minimizes `objective` from the current iterate.
    pub fn minimize<O>(
        &mut self,
        objective: &mut O,
        criterion: &StoppingCriterion<T>,
    ) -> OptimizerResult<OptimizationResult<T, F::Vector>>
    where
        O: Objective<T, F::Vector>,
        F::Vector: Clone,
    {
        self.minimize_with_callback(objective, criterion, &mut NoOpCallback)
    }

    /// Minimizes `objective`, reporting each completed iteration to
    /// `callback`.
    ///
    /// In a sharded run every participant must call this in lockstep
    /// with identical `criterion` values; the per-iteration collective
    /// schedule is identical on all ranks, including the decision
    /// branches, because every scalar feeding a branch has already been
    /// made globally consistent.
    pub fn minimize_with_callback<O, P>(
        &mut self,
        objective: &mut O,
        criterion: &StoppingCriterion<T>,
        callback: &mut P,
    ) -> OptimizerResult<OptimizationResult<T, F::Vector>>
    where
        O: Objective<T, F::Vector>,
        P: ProgressCallback<T, F::Vector>,
        F::Vector: Clone,
    {
        let start_time = Instant::now();
        callback.on_start()?;

        let mut g = self.factory.create();
        let mut g_new = self.factory.create();
        let mut x_new = self.factory.create();
        let mut direction = self.factory.create();
        let mut q = self.factory.create();
        let mut alpha: Vec<T> = Vec::with_capacity(self.config.memory_size);

        objective.set_point(&self.x);
        let mut value = objective.value()?;
        objective.gradient(&mut g)?;
        let mut function_evals = 1usize;
        let mut gradient_evals = 1usize;
        let mut gradient_norm = g.norm();
        let mut iterations = 0usize;

        let reason = loop {
            if gradient_norm <= criterion.gradient_tolerance {
                break TerminationReason::Converged;
            }
            if iterations >= criterion.max_iterations {
                break TerminationReason::MaxIterations;
            }

            self.history
                .compute_direction(&g, &mut q, &mut direction, &mut alpha)?;
            let mut slope = g.dot(&direction)?;
            if slope >= T::zero() {
                // A non-descent direction means the history no longer
                // reflects the local curvature. Drop it and restart
                // from steepest descent.
                self.history.clear();
                direction.copy_scaled(&g, -T::one())?;
                slope = -(gradient_norm * gradient_norm);
            }

            let outcome = self.line_search.search(
                objective,
                &self.x,
                value,
                &direction,
                slope,
                &mut x_new,
                &self.config.line_search,
            )?;
            function_evals += outcome.function_evals;
            if !outcome.success {
                break TerminationReason::LineSearchFailed;
            }
            iterations += 1;

            objective.set_point(&x_new);
            objective.gradient(&mut g_new)?;
            gradient_evals += 1;

            // Curvature pair for this step, admitted only when
            // y·s > 0 keeps the approximation positive definite.
            let (mut s, mut y) = self.history.take_buffers(&self.factory);
            s.copy_scaled(&x_new, T::one())?;
            s.axpy(-T::one(), &self.x)?;
            y.copy_scaled(&g_new, T::one())?;
            y.axpy(-T::one(), &g)?;
            let ys = y.dot(&s)?;
            if ys > T::zero() {
                self.history.push(s, y, T::one() / ys);
            } else {
                self.history.recycle(s, y);
            }

            self.x.swap(&mut x_new);
            g.swap(&mut g_new);
            let previous_value = value;
            value = outcome.new_value;
            gradient_norm = g.norm();

            let info = IterationInfo {
                iteration: iterations,
                value,
                gradient_norm,
                point: &self.x,
            };
            if !callback.on_iteration(&info)? {
                break TerminationReason::CallbackStopped;
            }

            // Relative stagnation: the decrease this iteration is
            // negligible against the value's own magnitude.
            let decrease = previous_value - value;
            let scale = <T as Float>::max(
                <T as Float>::abs(previous_value),
                <T as Float>::abs(value),
            );
            if decrease <= criterion.function_tolerance * scale {
                break TerminationReason::Converged;
            }
        };
        callback.on_finish()?;

        Ok(OptimizationResult::new(
            self.x.clone(),
            value,
            gradient_norm,
            iterations,
            start_time.elapsed(),
            reason,
        )
        .with_function_evaluations(function_evals)
        .with_gradient_evaluations(gradient_evals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::comm::SingleProcess;
    use crate::core::cost_function::QuadraticCost;
    use crate::core::objective::CostAdapter;
    use crate::core::space::{ShardedVector, ShardedVectorFactory};
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use std::sync::Arc;

    type Vector = ShardedVector<f64, SingleProcess>;

    fn factory(dim: usize) -> ShardedVectorFactory<f64, SingleProcess> {
        ShardedVectorFactory::new(dim, Arc::new(SingleProcess::new())).unwrap()
    }

    fn vector(values: &[f64]) -> Vector {
        ShardedVector::from_slice(values, Arc::new(SingleProcess::new())).unwrap()
    }

    #[test]
    fn test_config_validation() {
        assert!(LbfgsConfig::<f64>::default().validate().is_ok());
        assert!(LbfgsConfig::<f64>::new()
            .with_memory_size(0)
            .validate()
            .is_err());

        let bad_ls = LineSearchParams {
            c1: -1.0,
            ..LineSearchParams::default()
        };
        assert!(LbfgsConfig::<f64>::new()
            .with_line_search(bad_ls)
            .validate()
            .is_err());

        assert!(Lbfgs::new(factory(2), LbfgsConfig::new().with_memory_size(0)).is_err());
    }

    #[test]
    fn test_history_evicts_oldest_at_capacity() {
        let f = factory(1);
        let mut history: History<f64, Vector> = History::new(2);

        for k in 1..=3 {
            let (mut s, mut y) = history.take_buffers(&f);
            s.local_mut()[0] = k as f64;
            y.local_mut()[0] = k as f64;
            history.push(s, y, 1.0 / (k as f64 * k as f64));
        }

        assert_eq!(history.len(), 2);
        // Pairs 2 and 3 survive; pair 1 was evicted into the pool.
        assert_relative_eq!(history.pairs[0].s.local()[0], 2.0);
        assert_relative_eq!(history.pairs[1].s.local()[0], 3.0);
        assert_eq!(history.pool.len(), 1);

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.pool.len(), 3);
    }

    #[test]
    fn test_empty_history_direction_is_steepest_descent() {
        let history: History<f64, Vector> = History::new(5);
        let g = vector(&[3.0, -4.0]);
        let mut q = vector(&[0.0, 0.0]);
        let mut d = vector(&[0.0, 0.0]);
        let mut alpha = Vec::new();

        history.compute_direction(&g, &mut q, &mut d, &mut alpha).unwrap();
        assert_eq!(d.local(), &[-3.0, 4.0]);
    }

    #[test]
    fn test_two_loop_recovers_newton_step_on_quadratic() {
        // For f(x) = x^2 / 2 one exact pair makes the two-loop
        // direction the Newton step -g.
        let f = factory(1);
        let mut history: History<f64, Vector> = History::new(5);
        let (mut s, mut y) = history.take_buffers(&f);
        s.local_mut()[0] = -1.0;
        y.local_mut()[0] = -1.0; // y = H s with H = 1
        history.push(s, y, 1.0);

        let g = vector(&[4.0]);
        let mut q = vector(&[0.0]);
        let mut d = vector(&[0.0]);
        let mut alpha = Vec::new();
        history.compute_direction(&g, &mut q, &mut d, &mut alpha).unwrap();
        assert_relative_eq!(d.local()[0], -4.0);
    }

    #[test]
    fn test_minimizes_quadratic_from_far_start() {
        let dim = 4;
        let cost = QuadraticCost::new(vec![1.0, -2.0, 3.0, 0.5], vec![1.0; dim]).unwrap();
        let mut adapter = CostAdapter::new(cost, dim);
        let mut engine = Lbfgs::new(factory(dim), LbfgsConfig::default()).unwrap();
        engine
            .set_starting(&vector(&[1000.0, 1000.0, 1000.0, 1000.0]))
            .unwrap();

        let criterion = StoppingCriterion::new()
            .with_gradient_tolerance(1e-8)
            .with_function_tolerance(1e-14);
        let result = engine.minimize(&mut adapter, &criterion).unwrap();

        assert!(result.converged);
        assert_eq!(result.termination_reason, TerminationReason::Converged);
        let expected = [1.0, -2.0, 3.0, 0.5];
        for (xi, ei) in result.point.local().iter().zip(expected) {
            assert_relative_eq!(*xi, ei, epsilon = 1e-6);
        }
        assert!(result.function_evaluations >= result.iterations);
        assert_eq!(result.gradient_evaluations, result.iterations + 1);
    }

    #[test]
    fn test_zero_iteration_budget_returns_start_unchanged() {
        let cost = QuadraticCost::isotropic(2).unwrap();
        let mut adapter = CostAdapter::new(cost, 2);
        let mut engine = Lbfgs::new(factory(2), LbfgsConfig::default()).unwrap();
        engine.set_starting(&vector(&[7.0, -3.0])).unwrap();

        let criterion = StoppingCriterion::new().with_max_iterations(0);
        let result = engine.minimize(&mut adapter, &criterion).unwrap();

        assert_eq!(result.termination_reason, TerminationReason::MaxIterations);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.point.local(), &[7.0, -3.0]);
    }

    #[test]
    fn test_already_converged_start() {
        let cost = QuadraticCost::isotropic(2).unwrap();
        let mut adapter = CostAdapter::new(cost, 2);
        let mut engine = Lbfgs::new(factory(2), LbfgsConfig::default()).unwrap();
        engine.set_starting(&vector(&[0.0, 0.0])).unwrap();

        let result = engine
            .minimize(&mut adapter, &StoppingCriterion::new())
            .unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.function_evaluations, 1);
    }

    #[test]
    fn test_callback_stop_is_honored() {
        struct StopAfter {
            limit: usize,
            seen: usize,
        }
        impl ProgressCallback<f64, Vector> for StopAfter {
            fn on_iteration(
                &mut self,
                _info: &IterationInfo<'_, f64, Vector>,
            ) -> OptimizerResult<bool> {
                self.seen += 1;
                Ok(self.seen < self.limit)
            }
        }

        let cost = QuadraticCost::new(vec![0.0, 0.0], vec![1.0, 3.0]).unwrap();
        let mut adapter = CostAdapter::new(cost, 2);
        let mut engine = Lbfgs::new(factory(2), LbfgsConfig::default()).unwrap();
        engine.set_starting(&vector(&[100.0, -250.0])).unwrap();

        let mut cb = StopAfter { limit: 1, seen: 0 };
        let criterion = StoppingCriterion::new()
            .with_gradient_tolerance(1e-12)
            .with_function_tolerance(1e-16);
        let result = engine
            .minimize_with_callback(&mut adapter, &criterion, &mut cb)
            .unwrap();

        assert_eq!(result.termination_reason, TerminationReason::CallbackStopped);
        assert_eq!(result.iterations, 1);
        assert!(!result.converged);
    }

    #[test]
    fn test_stored_pairs_keep_positive_curvature() {
        // Double well f(x) = x^4 - 3x^2 is nonconvex; some steps can
        // produce y·s <= 0 and those pairs must be screened out, so
        // every stored rho = 1/(y·s) stays positive.
        use crate::core::cost_function::FnCost;
        let double_well = FnCost::new(
            |x: &[f64]| Ok(x[0].powi(4) - 3.0 * x[0].powi(2)),
            |x: &[f64], g: &mut [f64]| {
                g[0] = 4.0 * x[0].powi(3) - 6.0 * x[0];
                Ok(())
            },
        );
        let mut adapter = CostAdapter::new(double_well, 1);
        let mut engine = Lbfgs::new(factory(1), LbfgsConfig::default()).unwrap();
        engine.set_starting(&vector(&[2.5])).unwrap();

        let criterion = StoppingCriterion::new()
            .with_gradient_tolerance(1e-8)
            .with_function_tolerance(1e-14);
        let result = engine.minimize(&mut adapter, &criterion).unwrap();

        assert!(result.converged);
        // Minima at ±sqrt(3/2) with value -9/4; backtracking from this
        // start overshoots into the negative well.
        assert_relative_eq!(result.point.local()[0].abs(), (1.5f64).sqrt(), epsilon = 1e-4);
        assert_relative_eq!(result.value, -2.25, epsilon = 1e-8);
        assert!(!engine.history.is_empty());
        for pair in &engine.history.pairs {
            assert!(pair.rho > 0.0);
        }
    }

    #[test]
    fn test_set_starting_makes_runs_identical() {
        struct Trace(Vec<(f64, f64)>);
        impl ProgressCallback<f64, Vector> for Trace {
            fn on_iteration(
                &mut self,
                info: &IterationInfo<'_, f64, Vector>,
            ) -> OptimizerResult<bool> {
                self.0.push((info.value, info.gradient_norm));
                Ok(true)
            }
        }

        let x0 = vector(&[12.0, -7.0, 3.0]);
        let criterion = StoppingCriterion::new()
            .with_gradient_tolerance(1e-9)
            .with_function_tolerance(1e-14);
        let mut engine = Lbfgs::new(factory(3), LbfgsConfig::default()).unwrap();

        let mut traces = Vec::new();
        for _ in 0..2 {
            let cost = QuadraticCost::new(vec![1.0, 2.0, -1.0], vec![1.0, 2.0, 0.5]).unwrap();
            let mut adapter = CostAdapter::new(cost, 3);
            engine.set_starting(&x0).unwrap();
            let mut trace = Trace(Vec::new());
            engine
                .minimize_with_callback(&mut adapter, &criterion, &mut trace)
                .unwrap();
            traces.push(trace.0);
        }
        assert!(!traces[0].is_empty());
        assert_eq!(traces[0], traces[1]);
    }

    #[test]
    fn test_inconsistent_gradient_fails_line_search() {
        // A "gradient" pointing away from every descent direction:
        // f(x) = x with g reported as -1, so d = +1 always ascends in
        // reported slope terms while f keeps growing along it.
        use crate::core::cost_function::FnCost;
        let lying = FnCost::new(
            |x: &[f64]| Ok(x[0]),
            |_x: &[f64], g: &mut [f64]| {
                g[0] = -1.0;
                Ok(())
            },
        );
        let mut adapter = CostAdapter::new(lying, 1);
        let mut engine = Lbfgs::new(factory(1), LbfgsConfig::default()).unwrap();
        engine.set_starting(&vector(&[0.0])).unwrap();

        let result = engine
            .minimize(&mut adapter, &StoppingCriterion::new())
            .unwrap();
        assert_eq!(result.termination_reason, TerminationReason::LineSearchFailed);
        assert!(!result.converged);
        // The returned point is the last one that satisfied sufficient
        // decrease, i.e. the start.
        assert_eq!(result.point.local(), &[0.0]);
    }

    proptest! {
        #[test]
        fn prop_history_never_exceeds_capacity(
            capacity in 1usize..6,
            admits in proptest::collection::vec(any::<bool>(), 0..40),
        ) {
            let f = factory(1);
            let mut history: History<f64, Vector> = History::new(capacity);
            let mut live = 0usize;

            for (k, admit) in admits.iter().enumerate() {
                let (mut s, mut y) = history.take_buffers(&f);
                s.local_mut()[0] = k as f64 + 1.0;
                y.local_mut()[0] = 1.0;
                if *admit {
                    history.push(s, y, 1.0);
                    live = (live + 1).min(capacity);
                } else {
                    history.recycle(s, y);
                }
                prop_assert_eq!(history.len(), live);
                prop_assert!(history.len() <= capacity);
            }

            // Surviving pairs are the most recent admissions, oldest
            // first.
            let mut admitted: Vec<f64> = admits
                .iter()
                .enumerate()
                .filter(|(_, a)| **a)
                .map(|(k, _)| k as f64 + 1.0)
                .collect();
            let keep = admitted.split_off(admitted.len().saturating_sub(capacity));
            let stored: Vec<f64> =
                history.pairs.iter().map(|p| p.s.local()[0]).collect();
            prop_assert_eq!(stored, keep);
        }
    }
}
