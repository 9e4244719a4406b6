//! Small problems shared by the harness integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pareval_common::{HarnessConfig, KernelError};
use pareval_harness::{kernel_fn, Kernel, Problem};

/// `y[i] = 2 * x[i]` over f64 input in `[-100, 100)`.
pub struct Doubling {
    reference: Box<dyn Kernel<f64, f64>>,
}

pub fn double(input: &[f64], output: &mut [f64]) -> Result<(), KernelError> {
    KernelError::check_len(input.len(), output.len())?;
    for (o, i) in output.iter_mut().zip(input) {
        *o = 2.0 * i;
    }
    Ok(())
}

impl Doubling {
    pub fn new() -> Self {
        Self { reference: Box::new(kernel_fn("serial", double)) }
    }
}

impl Problem for Doubling {
    type Input = f64;
    type Output = f64;

    fn name(&self) -> &str {
        "doubling"
    }

    fn input_bounds(&self) -> (f64, f64) {
        (-100.0, 100.0)
    }

    fn reference(&self) -> &dyn Kernel<f64, f64> {
        self.reference.as_ref()
    }
}

/// `y[i] = x[2i] + x[2i + 1]`: output is half the input length.
pub struct PairSums {
    reference: Box<dyn Kernel<i64, i64>>,
}

pub fn pair_sums(input: &[i64], output: &mut [i64]) -> Result<(), KernelError> {
    KernelError::check_len(input.len() / 2, output.len())?;
    for (o, pair) in output.iter_mut().zip(input.chunks_exact(2)) {
        *o = pair[0] + pair[1];
    }
    Ok(())
}

impl PairSums {
    pub fn new() -> Self {
        Self { reference: Box::new(kernel_fn("serial", pair_sums)) }
    }
}

impl Problem for PairSums {
    type Input = i64;
    type Output = i64;

    fn name(&self) -> &str {
        "pair_sums"
    }

    fn input_bounds(&self) -> (i64, i64) {
        (0, 1 << 30)
    }

    fn output_len(&self, input_len: usize) -> usize {
        input_len / 2
    }

    fn reference(&self) -> &dyn Kernel<i64, i64> {
        self.reference.as_ref()
    }
}

/// Candidate that doubles correctly except on call `fail_on` (zero-based),
/// where it corrupts the last element. Counts every call.
pub fn doubling_failing_on(
    fail_on: Option<usize>,
    calls: Arc<AtomicUsize>,
) -> impl Kernel<f64, f64> + 'static {
    kernel_fn("flaky", move |input: &[f64], output: &mut [f64]| {
        let call = calls.fetch_add(1, Ordering::SeqCst);
        double(input, output)?;
        if Some(call) == fail_on {
            if let Some(last) = output.last_mut() {
                *last += 1.0;
            }
        }
        Ok(())
    })
}

/// Small, seeded configuration so tests run quickly and reproducibly.
pub fn small_config() -> HarnessConfig {
    HarnessConfig::default()
        .with_problem_size(4096)
        .with_trial_size(256)
        .with_max_validation_attempts(10)
        .with_seed(0x5eed)
}
