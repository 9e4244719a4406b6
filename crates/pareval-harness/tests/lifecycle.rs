//! Lifecycle behaviour of `Driver`: sizing, reset, non-interference, and
//! mirroring into a staged memory space.

mod support;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use pareval_common::{HarnessConfig, HarnessError, KernelError};
use pareval_harness::{kernel_fn, Benchmark, Driver, StagedSpace, TransferStats};
use support::{double, doubling_failing_on, pair_sums, small_config, Doubling, PairSums};

// ---------------------------------------------------------------------------
// Sizing and reset
// ---------------------------------------------------------------------------

#[test]
fn init_sizes_buffers_from_config() {
    let driver = Driver::new(PairSums::new(), kernel_fn("c", pair_sums), small_config()).unwrap();
    let ctx = driver.init().unwrap();
    assert_eq!(ctx.problem_size(), 4096);
    assert_eq!(ctx.trial_size(), 256);
    assert_eq!(ctx.output().len(), 2048);
    assert_eq!(ctx.best_output().len(), 2048);
    assert_eq!(ctx.resets(), 1);
    assert!(!ctx.is_mirrored());
    driver.destroy(ctx);
}

#[test]
fn resets_redraw_input_and_keep_sizes() {
    let driver = Driver::new(Doubling::new(), kernel_fn("c", double), small_config()).unwrap();
    let mut ctx = driver.init().unwrap();
    let mut previous = ctx.input().to_vec();

    for round in 0..5 {
        driver.reset(&mut ctx).unwrap();
        assert_ne!(ctx.input(), previous.as_slice(), "reset {round} reused the input");
        assert_eq!(ctx.problem_size(), 4096);
        assert_eq!(ctx.trial_size(), 256);
        assert_eq!(ctx.output().len(), 4096);
        assert!(ctx.input().iter().all(|x| (-100.0..100.0).contains(x)));

        driver.compute(&mut ctx).unwrap();
        driver.best(&mut ctx).unwrap();
        assert!(driver.validate(&mut ctx).unwrap());
        assert_eq!(ctx.problem_size(), 4096);
        previous = ctx.input().to_vec();
    }
    assert_eq!(ctx.resets(), 6);
    driver.destroy(ctx);
}

#[test]
fn same_seed_reproduces_input() {
    let a = Driver::new(Doubling::new(), kernel_fn("c", double), small_config()).unwrap();
    let b = Driver::new(Doubling::new(), kernel_fn("c", double), small_config()).unwrap();
    let ca = a.init().unwrap();
    let cb = b.init().unwrap();
    assert_eq!(ca.seed(), 0x5eed);
    assert_eq!(ca.input(), cb.input());
}

// ---------------------------------------------------------------------------
// Non-interference
// ---------------------------------------------------------------------------

#[test]
fn best_does_not_clobber_compute_output() {
    // The candidate negates instead of doubling, so its output is distinct
    // from the reference's.
    let negate = kernel_fn("negate", |input: &[f64], output: &mut [f64]| {
        KernelError::check_len(input.len(), output.len())?;
        for (o, i) in output.iter_mut().zip(input) {
            *o = -i;
        }
        Ok(())
    });
    let driver = Driver::new(Doubling::new(), negate, small_config()).unwrap();
    let mut ctx = driver.init().unwrap();

    driver.compute(&mut ctx).unwrap();
    let computed = ctx.output().to_vec();
    driver.best(&mut ctx).unwrap();

    assert_eq!(ctx.output(), computed.as_slice());
    let expected: Vec<f64> = ctx.input().iter().map(|x| 2.0 * x).collect();
    assert_eq!(ctx.best_output(), expected.as_slice());
}

#[test]
fn compute_leaves_input_untouched() {
    let driver = Driver::new(Doubling::new(), kernel_fn("c", double), small_config()).unwrap();
    let mut ctx = driver.init().unwrap();
    let before = ctx.input().to_vec();
    driver.compute(&mut ctx).unwrap();
    driver.best(&mut ctx).unwrap();
    assert_eq!(ctx.input(), before.as_slice());
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn invalid_config_is_rejected_at_construction() {
    let config = HarnessConfig::default().with_trial_size(0);
    let err = Driver::new(Doubling::new(), kernel_fn("c", double), config).unwrap_err();
    assert!(matches!(err, HarnessError::Config(_)));
}

#[test]
fn oversized_problem_fails_allocation() {
    let config = small_config().with_problem_size(usize::MAX);
    let driver = Driver::new(Doubling::new(), kernel_fn("c", double), config).unwrap();
    let err = driver.init().unwrap_err();
    assert!(matches!(err, HarnessError::Allocation { elements: usize::MAX, .. }));
}

#[test]
fn kernel_errors_propagate_from_compute() {
    let failing = kernel_fn("failing", |_: &[f64], _: &mut [f64]| {
        Err(KernelError::Failed { kernel: "failing".into(), reason: "unsupported".into() })
    });
    let driver = Driver::new(Doubling::new(), failing, small_config()).unwrap();
    let mut ctx = driver.init().unwrap();
    assert!(matches!(driver.compute(&mut ctx), Err(HarnessError::Kernel(_))));
    assert!(matches!(driver.validate(&mut ctx), Err(HarnessError::Kernel(_))));
}

// ---------------------------------------------------------------------------
// Staged memory space
// ---------------------------------------------------------------------------

#[test]
fn reset_stages_input_into_mirror() {
    let space = StagedSpace::new();
    let driver = Driver::new(Doubling::new(), kernel_fn("c", double), small_config())
        .unwrap()
        .in_space(space.clone());
    let mut ctx = driver.init().unwrap();

    assert!(ctx.is_mirrored());
    assert_eq!(ctx.resident_input(), ctx.input());
    assert_eq!(space.stats().uploads, 1);

    driver.reset(&mut ctx).unwrap();
    assert_eq!(ctx.resident_input(), ctx.input());
    assert_eq!(space.stats().uploads, 2);
    assert_eq!(space.stats().bytes_uploaded, 2 * 4096 * 8);
}

#[test]
fn staged_compute_writes_resident_output() {
    let space = StagedSpace::new();
    let driver = Driver::new(Doubling::new(), kernel_fn("c", double), small_config())
        .unwrap()
        .in_space(space.clone());
    let mut ctx = driver.init().unwrap();

    driver.compute(&mut ctx).unwrap();
    driver.best(&mut ctx).unwrap();
    assert_eq!(ctx.output(), ctx.best_output());
    // Timed runs stay inside the space; only `reset` crosses it.
    assert_eq!(space.stats().downloads, 0);
}

#[test]
fn staged_validation_transfers_once_per_trial() {
    let space = StagedSpace::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let driver =
        Driver::new(Doubling::new(), doubling_failing_on(None, calls), small_config())
            .unwrap()
            .in_space(space.clone());
    let mut ctx = driver.init().unwrap();
    assert!(driver.validate(&mut ctx).unwrap());

    assert_eq!(
        space.stats(),
        TransferStats {
            uploads: 1 + 10,
            downloads: 10,
            bytes_uploaded: (4096 + 10 * 256) * 8,
            bytes_downloaded: 10 * 256 * 8,
        }
    );
}
