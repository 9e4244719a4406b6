//! Memory spaces a candidate kernel may execute in.
//!
//! A candidate that runs somewhere other than host memory (a device, a
//! separate heap, a remote unit) sees its input through a mirror buffer.
//! The driver stages host input into the mirror before the candidate runs
//! and copies results back afterwards; [`MemorySpace`] is the copy contract.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pareval_common::{Element, HarnessError, Result};
use serde::{Deserialize, Serialize};
use tracing::trace;

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

/// Allocate `len` default-initialised elements, reporting failure instead of
/// aborting the process.
pub fn try_alloc<T: Element>(buffer: &'static str, len: usize) -> Result<Vec<T>> {
    let mut data = Vec::new();
    data.try_reserve_exact(len).map_err(|_| HarnessError::Allocation { buffer, elements: len })?;
    data.resize(len, T::default());
    Ok(data)
}

/// A buffer resident in a particular [`MemorySpace`].
#[derive(Clone, PartialEq)]
pub struct SpaceBuffer<T> {
    data: Vec<T>,
    space: &'static str,
}

impl<T> SpaceBuffer<T> {
    pub fn space(&self) -> &'static str {
        self.space
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Contents as seen by a kernel running in the buffer's space.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> fmt::Debug for SpaceBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpaceBuffer").field("space", &self.space).field("len", &self.data.len()).finish()
    }
}

// ---------------------------------------------------------------------------
// Memory space contract
// ---------------------------------------------------------------------------

/// Where a candidate kernel reads its input and writes its output.
pub trait MemorySpace: Send + Sync + fmt::Debug {
    /// Short name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Whether kernels in this space need host buffers mirrored into it.
    fn requires_mirror(&self) -> bool;

    /// Allocate a zeroed buffer of `len` elements in this space.
    fn alloc<T: Element>(&self, buffer: &'static str, len: usize) -> Result<SpaceBuffer<T>> {
        Ok(SpaceBuffer { data: try_alloc(buffer, len)?, space: self.name() })
    }

    /// Copy `host` into `resident`. Lengths must match.
    fn upload<T: Element>(&self, host: &[T], resident: &mut SpaceBuffer<T>) -> Result<()>;

    /// Copy `resident` back into `host`. Lengths must match.
    fn download<T: Element>(&self, resident: &SpaceBuffer<T>, host: &mut [T]) -> Result<()>;
}

fn check_transfer(space: &'static str, host: usize, resident: usize) -> Result<()> {
    if host == resident {
        Ok(())
    } else {
        Err(HarnessError::TransferLength { space, host, resident })
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// The candidate runs directly on host buffers; no mirror is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostSpace;

impl MemorySpace for HostSpace {
    fn name(&self) -> &'static str {
        "host"
    }

    fn requires_mirror(&self) -> bool {
        false
    }

    fn upload<T: Element>(&self, host: &[T], resident: &mut SpaceBuffer<T>) -> Result<()> {
        check_transfer(self.name(), host.len(), resident.len())?;
        resident.data.copy_from_slice(host);
        Ok(())
    }

    fn download<T: Element>(&self, resident: &SpaceBuffer<T>, host: &mut [T]) -> Result<()> {
        check_transfer(self.name(), host.len(), resident.len())?;
        host.copy_from_slice(&resident.data);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Host-staged
// ---------------------------------------------------------------------------

/// Transfer counters for a [`StagedSpace`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    pub uploads: u64,
    pub downloads: u64,
    pub bytes_uploaded: u64,
    pub bytes_downloaded: u64,
}

#[derive(Debug, Default)]
struct Counters {
    uploads: AtomicU64,
    downloads: AtomicU64,
    bytes_uploaded: AtomicU64,
    bytes_downloaded: AtomicU64,
}

/// A separate memory space reached through explicit host-staged copies.
///
/// Buffers live in their own allocations, so a candidate running here never
/// touches host input directly. Clones share one set of counters.
#[derive(Debug, Clone, Default)]
pub struct StagedSpace {
    counters: Arc<Counters>,
}

impl StagedSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the transfers made so far.
    pub fn stats(&self) -> TransferStats {
        TransferStats {
            uploads: self.counters.uploads.load(Ordering::Relaxed),
            downloads: self.counters.downloads.load(Ordering::Relaxed),
            bytes_uploaded: self.counters.bytes_uploaded.load(Ordering::Relaxed),
            bytes_downloaded: self.counters.bytes_downloaded.load(Ordering::Relaxed),
        }
    }
}

fn byte_len<T>(len: usize) -> u64 {
    (len * std::mem::size_of::<T>()) as u64
}

impl MemorySpace for StagedSpace {
    fn name(&self) -> &'static str {
        "staged"
    }

    fn requires_mirror(&self) -> bool {
        true
    }

    fn upload<T: Element>(&self, host: &[T], resident: &mut SpaceBuffer<T>) -> Result<()> {
        check_transfer(self.name(), host.len(), resident.len())?;
        resident.data.copy_from_slice(host);
        self.counters.uploads.fetch_add(1, Ordering::Relaxed);
        self.counters.bytes_uploaded.fetch_add(byte_len::<T>(host.len()), Ordering::Relaxed);
        trace!(elements = host.len(), "staged upload");
        Ok(())
    }

    fn download<T: Element>(&self, resident: &SpaceBuffer<T>, host: &mut [T]) -> Result<()> {
        check_transfer(self.name(), host.len(), resident.len())?;
        host.copy_from_slice(&resident.data);
        self.counters.downloads.fetch_add(1, Ordering::Relaxed);
        self.counters.bytes_downloaded.fetch_add(byte_len::<T>(host.len()), Ordering::Relaxed);
        trace!(elements = host.len(), "staged download");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_alloc_zero_initialises() {
        let buf: Vec<f64> = try_alloc("input", 16).unwrap();
        assert_eq!(buf, vec![0.0; 16]);
    }

    #[test]
    fn try_alloc_reports_capacity_overflow() {
        let err = try_alloc::<u64>("input", usize::MAX).unwrap_err();
        assert!(matches!(err, HarnessError::Allocation { buffer: "input", elements: usize::MAX }));
    }

    #[test]
    fn staged_round_trip_counts_transfers() {
        let space = StagedSpace::new();
        let mut resident = space.alloc::<i32>("input", 4).unwrap();
        assert_eq!(resident.space(), "staged");

        space.upload(&[1, 2, 3, 4], &mut resident).unwrap();
        let mut back = [0i32; 4];
        space.download(&resident, &mut back).unwrap();

        assert_eq!(back, [1, 2, 3, 4]);
        assert_eq!(
            space.stats(),
            TransferStats { uploads: 1, downloads: 1, bytes_uploaded: 16, bytes_downloaded: 16 }
        );
    }

    #[test]
    fn clones_share_counters() {
        let space = StagedSpace::new();
        let other = space.clone();
        let mut resident = other.alloc::<bool>("mask", 2).unwrap();
        other.upload(&[true, false], &mut resident).unwrap();
        assert_eq!(space.stats().uploads, 1);
    }

    #[test]
    fn mismatched_transfer_is_rejected() {
        let space = StagedSpace::new();
        let mut resident = space.alloc::<f32>("output", 3).unwrap();
        let err = space.upload(&[1.0, 2.0], &mut resident).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::TransferLength { space: "staged", host: 2, resident: 3 }
        ));
        assert_eq!(space.stats().uploads, 0);
    }

    #[test]
    fn host_space_needs_no_mirror() {
        assert!(!HostSpace.requires_mirror());
        assert!(StagedSpace::new().requires_mirror());
    }
}
