//! Vector-space abstraction over possibly sharded parameter vectors.
//!
//! A [`VectorSpace`] value represents one point or direction in
//! parameter space and exposes only the arithmetic the optimizer
//! needs: zeroing, copy-with-scale, norm, dot product, add-with-scale,
//! and constant-time swap. Nothing in the contract assumes a storage
//! layout, which is what lets the same algorithm drive a plain
//! in-memory vector or a vector whose components are split across
//! SPMD participants.
//!
//! [`ShardedVector`] is the concrete implementation: a local
//! `nalgebra` shard plus a shared [`Communicator`] handle. `norm` and
//! `dot` reduce local contributions across the group and redistribute
//! the scalar, so every participant holds the identical value before
//! using it in a control-flow decision.

use crate::core::comm::Communicator;
use crate::core::error::{CoreError, Result};
use crate::core::types::{DVector, Scalar};
use num_traits::Float;
use std::sync::Arc;

/// Arithmetic contract required of a (possibly distributed) vector.
///
/// The dimension is fixed at construction and invariant for the
/// instance's lifetime. Binary operations require matching dimensions
/// (matching per-participant shard lengths in the sharded case);
/// a mismatch is a precondition violation reported as an error.
pub trait VectorSpace<T: Scalar>: Sized {
    /// Length of the locally owned component sequence.
    fn dimension(&self) -> usize;

    /// Sets every component to zero.
    fn set_zero(&mut self);

    /// Replaces the contents with `c * other`.
    fn copy_scaled(&mut self, other: &Self, c: T) -> Result<()>;

    /// Global Euclidean norm.
    ///
    /// In a sharded run this blocks on a collective reduction and
    /// returns the same scalar on every participant.
    fn norm(&self) -> T;

    /// Global inner product with `other`, with the same cross-
    /// participant consistency guarantee as [`VectorSpace::norm`].
    fn dot(&self, other: &Self) -> Result<T>;

    /// In-place `self += c * other`.
    fn axpy(&mut self, c: T, other: &Self) -> Result<()>;

    /// Exchanges contents with `other` in constant time.
    ///
    /// Both vectors must have the same dimension.
    fn swap(&mut self, other: &mut Self);
}

/// Produces fresh zero-initialized vectors of a configured dimension.
///
/// Decouples the optimizer from the concrete allocation strategy; the
/// engine only ever asks a factory for work buffers and history
/// entries.
pub trait VectorFactory<T: Scalar> {
    /// The vector type this factory allocates.
    type Vector: VectorSpace<T>;

    /// Local dimension of produced vectors.
    fn dimension(&self) -> usize;

    /// Allocates a new zero-initialized vector.
    fn create(&self) -> Self::Vector;
}

/// A parameter vector whose components may be sharded across
/// participants.
///
/// Holds the locally owned shard and a shared communicator handle.
/// With [`SingleProcess`](crate::core::comm::SingleProcess) this is an
/// ordinary in-memory vector; with a multi-member communicator each
/// instance owns one shard of the logical global vector and the
/// reduction primitives make `norm`/`dot` globally consistent.
#[derive(Debug)]
pub struct ShardedVector<T: Scalar, C: Communicator<T>> {
    data: DVector<T>,
    comm: Arc<C>,
}

// Manual impl: cloning shares the communicator handle, so `C` itself
// does not need to be `Clone`.
impl<T: Scalar, C: Communicator<T>> Clone for ShardedVector<T, C> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            comm: Arc::clone(&self.comm),
        }
    }
}

impl<T: Scalar, C: Communicator<T>> ShardedVector<T, C> {
    /// Creates a zero vector with `local_dim` locally owned components.
    ///
    /// Fails if `local_dim` is zero; the dimension is a construction-
    /// time precondition, not a runtime error.
    pub fn zeros(local_dim: usize, comm: Arc<C>) -> Result<Self> {
        if local_dim == 0 {
            return Err(CoreError::invalid_dimension(
                "local shard length must be positive",
            ));
        }
        Ok(Self {
            data: DVector::zeros(local_dim),
            comm,
        })
    }

    /// Creates a vector with the given local components.
    pub fn from_slice(values: &[T], comm: Arc<C>) -> Result<Self> {
        if values.is_empty() {
            return Err(CoreError::invalid_dimension(
                "local shard length must be positive",
            ));
        }
        Ok(Self {
            data: DVector::from_column_slice(values),
            comm,
        })
    }

    /// The locally owned components.
    pub fn local(&self) -> &[T] {
        self.data.as_slice()
    }

    /// Mutable access to the locally owned components.
    pub fn local_mut(&mut self) -> &mut [T] {
        self.data.as_mut_slice()
    }

    /// The communicator shared by all vectors of this run.
    pub fn communicator(&self) -> &C {
        &self.comm
    }

    /// Copies `values` into the local shard.
    pub fn copy_from_slice(&mut self, values: &[T]) -> Result<()> {
        if values.len() != self.data.len() {
            return Err(CoreError::dimension_mismatch(self.data.len(), values.len()));
        }
        self.data.as_mut_slice().copy_from_slice(values);
        Ok(())
    }

    fn check_dimension(&self, other: &Self) -> Result<()> {
        if self.data.len() != other.data.len() {
            return Err(CoreError::dimension_mismatch(
                self.data.len(),
                other.data.len(),
            ));
        }
        Ok(())
    }
}

impl<T: Scalar, C: Communicator<T>> VectorSpace<T> for ShardedVector<T, C> {
    fn dimension(&self) -> usize {
        self.data.len()
    }

    fn set_zero(&mut self) {
        self.data.fill(T::zero());
    }

    fn copy_scaled(&mut self, other: &Self, c: T) -> Result<()> {
        self.check_dimension(other)?;
        self.data.copy_from(&other.data);
        self.data *= c;
        Ok(())
    }

    fn norm(&self) -> T {
        let local = self.data.norm_squared();
        let total = self.comm.broadcast(self.comm.reduce_sum(local));
        <T as Float>::sqrt(total)
    }

    fn dot(&self, other: &Self) -> Result<T> {
        self.check_dimension(other)?;
        let local = self.data.dot(&other.data);
        Ok(self.comm.broadcast(self.comm.reduce_sum(local)))
    }

    fn axpy(&mut self, c: T, other: &Self) -> Result<()> {
        self.check_dimension(other)?;
        self.data.axpy(c, &other.data, T::one());
        Ok(())
    }

    fn swap(&mut self, other: &mut Self) {
        debug_assert_eq!(self.data.len(), other.data.len());
        std::mem::swap(&mut self.data, &mut other.data);
    }
}

/// Factory for [`ShardedVector`]s of a fixed local dimension.
#[derive(Debug)]
pub struct ShardedVectorFactory<T: Scalar, C: Communicator<T>> {
    local_dim: usize,
    comm: Arc<C>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Scalar, C: Communicator<T>> Clone for ShardedVectorFactory<T, C> {
    fn clone(&self) -> Self {
        Self {
            local_dim: self.local_dim,
            comm: Arc::clone(&self.comm),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T: Scalar, C: Communicator<T>> ShardedVectorFactory<T, C> {
    /// Creates a factory producing vectors with `local_dim` locally
    /// owned components, all sharing `comm`.
    pub fn new(local_dim: usize, comm: Arc<C>) -> Result<Self> {
        if local_dim == 0 {
            return Err(CoreError::invalid_dimension(
                "local shard length must be positive",
            ));
        }
        Ok(Self {
            local_dim,
            comm,
            _marker: std::marker::PhantomData,
        })
    }
}

impl<T: Scalar, C: Communicator<T>> VectorFactory<T> for ShardedVectorFactory<T, C> {
    type Vector = ShardedVector<T, C>;

    fn dimension(&self) -> usize {
        self.local_dim
    }

    fn create(&self) -> Self::Vector {
        ShardedVector {
            data: DVector::zeros(self.local_dim),
            comm: Arc::clone(&self.comm),
        }
    }
}
