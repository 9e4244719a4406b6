//! Inclusive prefix sum over `f64`.
//!
//! `output[i] = input[0] + ... + input[i]`, e.g. `[1, 7, 4, 6, 6, 2]`
//! scans to `[1, 8, 12, 18, 24, 26]`.

use pareval_common::KernelError;
use pareval_harness::{Kernel, Problem};
use rayon::prelude::*;
use tracing::trace;

/// Prefix sum over input drawn from `[-100, 100)`.
#[derive(Debug, Default)]
pub struct PrefixSum {
    reference: SerialScan,
}

impl PrefixSum {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Problem for PrefixSum {
    type Input = f64;
    type Output = f64;

    fn name(&self) -> &str {
        "scan_prefix_sum"
    }

    fn input_bounds(&self) -> (f64, f64) {
        (-100.0, 100.0)
    }

    fn reference(&self) -> &dyn Kernel<f64, f64> {
        &self.reference
    }
}

/// Scan `input` into `output` and return the block total.
fn scan_into(input: &[f64], output: &mut [f64]) -> f64 {
    let mut acc = 0.0;
    for (o, &x) in output.iter_mut().zip(input) {
        acc += x;
        *o = acc;
    }
    acc
}

/// Sequential running sum.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialScan;

impl Kernel<f64, f64> for SerialScan {
    fn name(&self) -> &str {
        "serial_scan"
    }

    fn run(&self, input: &[f64], output: &mut [f64]) -> Result<(), KernelError> {
        KernelError::check_len(input.len(), output.len())?;
        scan_into(input, output);
        Ok(())
    }
}

/// Blocked two-pass scan: each block is scanned in parallel, block totals
/// are scanned sequentially, and the carried offsets are added back in
/// parallel.
#[derive(Debug, Clone, Copy)]
pub struct ParallelScan {
    min_block: usize,
    block_len: Option<usize>,
}

impl ParallelScan {
    /// Small enough that trial-sized inputs still take the blocked path.
    pub const DEFAULT_MIN_BLOCK: usize = 128;

    pub fn new() -> Self {
        Self { min_block: Self::DEFAULT_MIN_BLOCK, block_len: None }
    }

    /// Smallest block handed to one worker; inputs no longer than this are
    /// scanned sequentially.
    #[must_use]
    pub fn with_min_block(mut self, min_block: usize) -> Self {
        self.min_block = min_block.max(1);
        self
    }

    /// Fix the block length instead of deriving it from the thread count.
    #[must_use]
    pub fn with_block_len(mut self, block_len: usize) -> Self {
        self.block_len = Some(block_len.max(1));
        self
    }

    fn block_len(&self, len: usize) -> usize {
        if let Some(fixed) = self.block_len {
            return fixed;
        }
        let workers = rayon::current_num_threads().max(1);
        len.div_ceil(workers).max(self.min_block)
    }
}

impl Default for ParallelScan {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel<f64, f64> for ParallelScan {
    fn name(&self) -> &str {
        "parallel_scan"
    }

    fn run(&self, input: &[f64], output: &mut [f64]) -> Result<(), KernelError> {
        KernelError::check_len(input.len(), output.len())?;
        let block = self.block_len(input.len());
        if input.len() <= block {
            scan_into(input, output);
            return Ok(());
        }

        let totals: Vec<f64> = output
            .par_chunks_mut(block)
            .zip(input.par_chunks(block))
            .map(|(out, inp)| scan_into(inp, out))
            .collect();

        trace!(blocks = totals.len(), block, "blocked scan first pass done");

        let mut offsets = Vec::with_capacity(totals.len());
        let mut running = 0.0;
        for total in &totals {
            offsets.push(running);
            running += total;
        }

        output.par_chunks_mut(block).zip(offsets.par_iter()).skip(1).for_each(|(out, &offset)| {
            for o in out {
                *o += offset;
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_scan_example() {
        let mut out = [0.0; 6];
        SerialScan.run(&[1.0, 7.0, 4.0, 6.0, 6.0, 2.0], &mut out).unwrap();
        assert_eq!(out, [1.0, 8.0, 12.0, 18.0, 24.0, 26.0]);
    }

    #[test]
    fn empty_input_scans_to_empty_output() {
        let mut out: [f64; 0] = [];
        SerialScan.run(&[], &mut out).unwrap();
        ParallelScan::new().run(&[], &mut out).unwrap();
    }

    #[test]
    fn blocked_scan_matches_serial_on_integers() {
        // Integer-valued input keeps every partial sum exact.
        let input: Vec<f64> = (0..10_000i32).map(|i| f64::from((i * 37) % 201 - 100)).collect();
        let mut serial = vec![0.0; input.len()];
        let mut parallel = vec![0.0; input.len()];
        SerialScan.run(&input, &mut serial).unwrap();
        ParallelScan::new().with_block_len(7).run(&input, &mut parallel).unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn trial_sized_input_is_split_across_workers() {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();
        let scan = ParallelScan::new();
        pool.install(|| {
            assert_eq!(scan.block_len(1024), 256);
            assert_eq!(scan.block_len(64), ParallelScan::DEFAULT_MIN_BLOCK);
        });

        let input: Vec<f64> = (0..1024i32).map(|i| f64::from(i % 13 - 6)).collect();
        let mut serial = vec![0.0; input.len()];
        let mut parallel = vec![0.0; input.len()];
        SerialScan.run(&input, &mut serial).unwrap();
        pool.install(|| scan.run(&input, &mut parallel)).unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn length_mismatch_is_reported() {
        let mut out = [0.0; 2];
        let err = ParallelScan::new().run(&[1.0, 2.0, 3.0], &mut out).unwrap_err();
        assert_eq!(err, KernelError::LengthMismatch { expected: 3, actual: 2 });
    }
}
