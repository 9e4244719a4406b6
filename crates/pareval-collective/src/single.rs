//! Single-unit collective: every primitive is a no-op.

use pareval_common::CollectiveError;

use crate::Collective;

/// The world of one execution unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleUnit;

impl Collective for SingleUnit {
    fn rank(&self) -> usize {
        0
    }

    fn world_size(&self) -> usize {
        1
    }

    fn broadcast_words(&self, _words: &mut Vec<u64>) -> Result<(), CollectiveError> {
        Ok(())
    }

    fn all_reduce_and(&self, local: bool) -> Result<bool, CollectiveError> {
        Ok(local)
    }

    fn barrier(&self) -> Result<(), CollectiveError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast_slice;

    #[test]
    fn single_unit_is_its_own_coordinator() {
        let unit = SingleUnit;
        assert!(unit.is_coordinator());
        assert_eq!(unit.world_size(), 1);
    }

    #[test]
    fn broadcast_leaves_buffer_untouched() {
        let mut buf = vec![1.5f64, -2.0, 3.25];
        broadcast_slice(&SingleUnit, &mut buf).unwrap();
        assert_eq!(buf, vec![1.5, -2.0, 3.25]);
    }

    #[test]
    fn reduce_returns_local_verdict() {
        assert!(SingleUnit.all_reduce_and(true).unwrap());
        assert!(!SingleUnit.all_reduce_and(false).unwrap());
        SingleUnit.barrier().unwrap();
    }
}
