//! In-process multi-unit collective backed by threads.
//!
//! Each collective call is a two-phase barrier protocol: units publish into
//! shared state, wait, read, and wait again so that no unit can start the
//! next call while a peer is still reading the current one.
//!
//! The barrier is a generation counter under a mutex rather than
//! `std::sync::Barrier`, so a unit that fails can wake its peers through
//! [`Collective::abort`].

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use pareval_common::CollectiveError;
use tracing::{trace, warn};

use crate::Collective;

#[derive(Debug, Default)]
struct Gate {
    arrived: usize,
    generation: u64,
    aborted_by: Option<usize>,
}

#[derive(Debug)]
struct Shared {
    world_size: usize,
    gate: Mutex<Gate>,
    released: Condvar,
    payload: Mutex<Vec<u64>>,
    votes: Mutex<Vec<bool>>,
}

impl Shared {
    fn gate(&self) -> Result<MutexGuard<'_, Gate>, CollectiveError> {
        self.gate.lock().map_err(|_| CollectiveError::Poisoned)
    }

    fn payload(&self) -> Result<MutexGuard<'_, Vec<u64>>, CollectiveError> {
        self.payload.lock().map_err(|_| CollectiveError::Poisoned)
    }

    fn votes(&self) -> Result<MutexGuard<'_, Vec<bool>>, CollectiveError> {
        self.votes.lock().map_err(|_| CollectiveError::Poisoned)
    }

    /// Wait until all units arrive or one of them aborts.
    fn wait(&self) -> Result<(), CollectiveError> {
        let mut gate = self.gate()?;
        if let Some(rank) = gate.aborted_by {
            return Err(CollectiveError::Aborted { rank });
        }
        gate.arrived += 1;
        if gate.arrived == self.world_size {
            gate.arrived = 0;
            gate.generation += 1;
            self.released.notify_all();
            return Ok(());
        }

        let generation = gate.generation;
        while gate.generation == generation {
            if let Some(rank) = gate.aborted_by {
                return Err(CollectiveError::Aborted { rank });
            }
            gate = self.released.wait(gate).map_err(|_| CollectiveError::Poisoned)?;
        }
        Ok(())
    }

    fn abort(&self, rank: usize) {
        // A poisoned gate already fails every waiter.
        if let Ok(mut gate) = self.gate.lock() {
            if gate.aborted_by.is_none() {
                gate.aborted_by = Some(rank);
            }
        }
        self.released.notify_all();
    }
}

/// One unit's handle into a group of threads acting as a world.
///
/// A unit that fails must call [`Collective::abort`] so its peers stop
/// waiting for it; a kernel that never returns still blocks the world.
#[derive(Debug, Clone)]
pub struct ThreadGroup {
    rank: usize,
    shared: Arc<Shared>,
}

impl ThreadGroup {
    /// Create a world of `world_size` units, returning one handle per rank
    /// in rank order. Move each handle to its own thread.
    pub fn new(world_size: usize) -> Result<Vec<Self>, CollectiveError> {
        if world_size == 0 {
            return Err(CollectiveError::InvalidWorld("world_size must be >= 1".into()));
        }
        let shared = Arc::new(Shared {
            world_size,
            gate: Mutex::new(Gate::default()),
            released: Condvar::new(),
            payload: Mutex::new(Vec::new()),
            votes: Mutex::new(vec![true; world_size]),
        });
        Ok((0..world_size).map(|rank| Self { rank, shared: Arc::clone(&shared) }).collect())
    }
}

impl Collective for ThreadGroup {
    fn rank(&self) -> usize {
        self.rank
    }

    fn world_size(&self) -> usize {
        self.shared.world_size
    }

    fn broadcast_words(&self, words: &mut Vec<u64>) -> Result<(), CollectiveError> {
        if self.is_coordinator() {
            let mut payload = self.shared.payload()?;
            payload.clear();
            payload.extend_from_slice(words);
        }
        self.shared.wait()?;

        if !self.is_coordinator() {
            let payload = self.shared.payload()?;
            words.clear();
            words.extend_from_slice(&payload);
        }
        self.shared.wait()?;

        trace!(rank = self.rank, words = words.len(), "broadcast complete");
        Ok(())
    }

    fn all_reduce_and(&self, local: bool) -> Result<bool, CollectiveError> {
        self.shared.votes()?[self.rank] = local;
        self.shared.wait()?;

        let agreed = self.shared.votes()?.iter().all(|&vote| vote);
        self.shared.wait()?;

        trace!(rank = self.rank, local, agreed, "all-reduce(and) complete");
        Ok(agreed)
    }

    fn barrier(&self) -> Result<(), CollectiveError> {
        self.shared.wait()
    }

    fn abort(&self) {
        warn!(rank = self.rank, "aborting collective world");
        self.shared.abort(self.rank);
    }
}
