//! Collective communication seam for sharded vectors.
//!
//! The optimizer core never talks to a communication layer directly;
//! only the vector-space `norm`/`dot` implementations invoke these
//! primitives. Participants execute the identical iteration logic in
//! lockstep (SPMD) and the collectives are the only blocking points:
//! every participant must reach them in the same relative order, and a
//! participant that issues a different number of collectives deadlocks
//! the whole group by design.
//!
//! Two implementations are provided: [`SingleProcess`], where the
//! collectives degenerate to identity operations, and [`ThreadGroup`],
//! an in-process SPMD group of threads synchronizing through a
//! generation-counted rendezvous. A wire-level binding (e.g. MPI) can
//! implement [`Communicator`] in a downstream crate.

use crate::core::types::Scalar;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Typed collective operations shared by all participants of a run.
///
/// `reduce_sum` combines one scalar contribution from every
/// participant; the combined value is guaranteed only on rank 0 (the
/// coordinator). `broadcast` then redistributes a scalar from rank 0
/// to everyone. Both calls block until every participant has arrived,
/// so a scalar obtained from `broadcast(reduce_sum(x))` is identical
/// on every rank before any rank uses it in a control-flow decision.
pub trait Communicator<T: Scalar>: Send + Sync {
    /// Ordinal index of this participant, in `0..size()`.
    fn rank(&self) -> usize;

    /// Number of cooperating participants.
    fn size(&self) -> usize;

    /// Combines `local` across all participants by summation.
    ///
    /// The returned value is authoritative on rank 0; other ranks must
    /// obtain it through [`Communicator::broadcast`].
    fn reduce_sum(&self, local: T) -> T;

    /// Delivers rank 0's `value` to every participant.
    fn broadcast(&self, value: T) -> T;
}

/// Degenerate communicator for unsharded, single-participant runs.
///
/// All collectives are identity operations and never block.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl SingleProcess {
    /// Creates the single-participant communicator.
    pub fn new() -> Self {
        Self
    }
}

impl<T: Scalar> Communicator<T> for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn reduce_sum(&self, local: T) -> T {
        local
    }

    fn broadcast(&self, value: T) -> T {
        value
    }
}

#[derive(Debug)]
struct Slot<T> {
    staged: T,
    value: T,
    arrived: usize,
    generation: u64,
}

#[derive(Debug)]
struct Shared<T> {
    slot: Mutex<Slot<T>>,
    cvar: Condvar,
}

/// In-process SPMD communicator: one handle per participating thread.
///
/// All handles of a group share one rendezvous slot. Each collective
/// waits until every member has contributed, publishes the combined
/// value, and advances a generation counter so that consecutive
/// collectives cannot interleave. A member still reading the result of
/// collective `k` cannot be overtaken: collective `k + 1` completes
/// only once all members (including the slow reader) have arrived at
/// it.
#[derive(Debug)]
pub struct ThreadGroup<T: Scalar> {
    rank: usize,
    size: usize,
    shared: Arc<Shared<T>>,
}

impl<T: Scalar> ThreadGroup<T> {
    /// Creates a group of `size` communicator handles, one per rank.
    ///
    /// The handle at index `i` reports rank `i`; each handle must be
    /// moved to exactly one thread of the group.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn split(size: usize) -> Vec<Self> {
        assert!(size > 0, "a thread group needs at least one member");
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                staged: T::zero(),
                value: T::zero(),
                arrived: 0,
                generation: 0,
            }),
            cvar: Condvar::new(),
        });
        (0..size)
            .map(|rank| Self {
                rank,
                size,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    /// One barrier-with-value round: stage this member's contribution,
    /// wait for the group, return the published value.
    fn rendezvous<F: FnOnce(&mut T)>(&self, stage: F) -> T {
        let mut slot = self.shared.slot.lock();
        let generation = slot.generation;
        stage(&mut slot.staged);
        slot.arrived += 1;
        if slot.arrived == self.size {
            slot.value = slot.staged;
            slot.staged = T::zero();
            slot.arrived = 0;
            slot.generation = slot.generation.wrapping_add(1);
            self.shared.cvar.notify_all();
        } else {
            while slot.generation == generation {
                self.shared.cvar.wait(&mut slot);
            }
        }
        slot.value
    }
}

impl<T: Scalar> Communicator<T> for ThreadGroup<T> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn reduce_sum(&self, local: T) -> T {
        self.rendezvous(|staged| *staged += local)
    }

    fn broadcast(&self, value: T) -> T {
        let rank = self.rank;
        self.rendezvous(|staged| {
            if rank == 0 {
                *staged = value;
            }
        })
    }
}
