//! Reduce per-unit trial verdicts to one agreed verdict.

use std::sync::Arc;

use pareval_common::CollectiveError;
use tracing::debug;

use crate::{Collective, SingleUnit};

/// Agrees on one boolean verdict across all units of a world.
///
/// Call [`agree`](Self::agree) once per validation trial on every unit so
/// that an early failure stops all units after the same trial.
#[derive(Debug, Clone)]
pub struct ConsensusGate {
    collective: Arc<dyn Collective>,
}

impl ConsensusGate {
    pub fn new(collective: Arc<dyn Collective>) -> Self {
        Self { collective }
    }

    pub fn collective(&self) -> &Arc<dyn Collective> {
        &self.collective
    }

    /// The verdict agreed by every unit: the AND of all local verdicts.
    ///
    /// With a single unit the local verdict is returned without any
    /// reduction step.
    pub fn agree(&self, local: bool) -> Result<bool, CollectiveError> {
        if self.collective.world_size() == 1 {
            return Ok(local);
        }
        let agreed = self.collective.all_reduce_and(local)?;
        if local && !agreed {
            debug!(rank = self.collective.rank(), "local pass overruled by a failing peer");
        }
        Ok(agreed)
    }
}

impl Default for ConsensusGate {
    fn default() -> Self {
        Self::new(Arc::new(SingleUnit))
    }
}
