//! Reproducible random input.

use pareval_collective::{broadcast_slice, Collective};
use pareval_common::{CollectiveError, Element};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Fills buffers with i.i.d. uniform values from a seeded ChaCha stream.
///
/// The stream advances across calls, so consecutive fills produce fresh
/// values while the whole sequence stays reproducible from [`seed`](Self::seed).
#[derive(Debug, Clone)]
pub struct InputSampler {
    rng: ChaCha8Rng,
    seed: u64,
}

impl InputSampler {
    /// Create a sampler; `None` picks a seed from the thread-local RNG.
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(|| rand::rng().random());
        Self { rng: ChaCha8Rng::seed_from_u64(seed), seed }
    }

    /// The seed this sampler's stream started from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Fill `buf` with values drawn from `[low, high)`.
    pub fn fill<T: Element>(&mut self, buf: &mut [T], low: T, high: T) {
        for slot in buf.iter_mut() {
            *slot = T::sample(&mut self.rng, low, high);
        }
    }

    /// Fill `buf` identically on every unit of `collective`.
    ///
    /// Only the coordinator draws; everyone else receives the drawn values
    /// through a broadcast, so all units hold bit-identical input.
    pub fn fill_shared<C, T>(
        &mut self,
        collective: &C,
        buf: &mut [T],
        low: T,
        high: T,
    ) -> Result<(), CollectiveError>
    where
        C: Collective + ?Sized,
        T: Element,
    {
        if collective.is_coordinator() {
            self.fill(buf, low, high);
        }
        broadcast_slice(collective, buf)
    }
}
