//! Multi-unit runtime contract for pareval.
//!
//! When a candidate kernel spans several cooperating execution units
//! (threads, processes, ranks), validation only means something if every
//! unit sees bit-identical input and every unit reaches the same verdict.
//! This crate defines the primitives the harness needs for that:
//!
//! | Primitive        | MPI analogue              | Used for                     |
//! |------------------|---------------------------|------------------------------|
//! | `is_coordinator` | `rank == 0`               | only rank 0 draws input      |
//! | `broadcast`      | `MPI_Bcast`               | share drawn input            |
//! | `all_reduce_and` | `MPI_Allreduce(MPI_LAND)` | agree on a trial verdict     |
//! | `barrier`        | `MPI_Barrier`             | fence after candidate runs   |
//!
//! [`SingleUnit`] is the degenerate implementation where every primitive
//! is a no-op; [`ThreadGroup`] runs several units inside one process.

use std::fmt;

use pareval_common::{CollectiveError, Element};

mod consensus;
mod single;
mod thread_group;

pub use consensus::ConsensusGate;
pub use single::SingleUnit;
pub use thread_group::ThreadGroup;

/// Rank of the unit that draws random input and broadcasts it.
pub const COORDINATOR_RANK: usize = 0;

/// Collective operations across the execution units of one benchmark run.
///
/// Every method is a synchronization point: all units of the world must
/// call it, in the same order, before any of them returns.
pub trait Collective: Send + Sync + fmt::Debug {
    /// Rank of this unit (0-based).
    fn rank(&self) -> usize;

    /// Number of participating units.
    fn world_size(&self) -> usize;

    fn is_coordinator(&self) -> bool {
        self.rank() == COORDINATOR_RANK
    }

    /// Replace `words` on every unit with the coordinator's `words`.
    fn broadcast_words(&self, words: &mut Vec<u64>) -> Result<(), CollectiveError>;

    /// Logical AND of `local` across all units, delivered to every unit.
    fn all_reduce_and(&self, local: bool) -> Result<bool, CollectiveError>;

    /// Block until every unit has arrived.
    fn barrier(&self) -> Result<(), CollectiveError>;

    /// Give up on the world after a local failure.
    ///
    /// Peers blocked in a collective call, and every later call on any
    /// unit, fail with [`CollectiveError::Aborted`] instead of waiting for
    /// this unit. Worlds of one unit have nobody to release.
    fn abort(&self) {}
}

/// Broadcast a typed buffer from the coordinator to every unit.
///
/// Values cross the wire as [`Element::to_word`] words, so floats keep their
/// exact bit patterns. Receivers must pass a buffer of the coordinator's
/// length.
pub fn broadcast_slice<C, T>(collective: &C, buf: &mut [T]) -> Result<(), CollectiveError>
where
    C: Collective + ?Sized,
    T: Element,
{
    if collective.world_size() == 1 {
        return Ok(());
    }

    let coordinator = collective.is_coordinator();
    let mut words: Vec<u64> = if coordinator {
        buf.iter().map(|v| v.to_word()).collect()
    } else {
        Vec::with_capacity(buf.len())
    };

    collective.broadcast_words(&mut words)?;

    if !coordinator {
        if words.len() != buf.len() {
            return Err(CollectiveError::LengthMismatch {
                rank: collective.rank(),
                expected: buf.len(),
                actual: words.len(),
            });
        }
        for (dst, word) in buf.iter_mut().zip(words) {
            *dst = T::from_word(word);
        }
    }
    Ok(())
}
