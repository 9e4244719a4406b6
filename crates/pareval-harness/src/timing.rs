//! Wall-clock timing of lifecycle entry points.
//!
//! The measured call goes through a non-inlined boundary and its result is
//! passed through [`black_box`], so the optimizer can neither elide the
//! kernel nor move it outside the timed region.

use std::fmt;
use std::hint::black_box;
use std::time::{Duration, Instant};

use pareval_common::{Result, TimingConfig};
use serde::Serialize;
use tracing::debug;

use crate::driver::Benchmark;

/// Which entry point is being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPoint {
    /// The candidate kernel.
    Compute,
    /// The reference kernel.
    Best,
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compute => write!(f, "compute"),
            Self::Best => write!(f, "best"),
        }
    }
}

/// Raw per-run timings plus simple aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingSummary {
    pub runs_ns: Vec<u64>,
    pub min_ns: u64,
    pub mean_ns: f64,
}

impl TimingSummary {
    fn from_runs(runs: Vec<Duration>) -> Self {
        let runs_ns: Vec<u64> =
            runs.iter().map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)).collect();
        let min_ns = runs_ns.iter().copied().min().unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let mean_ns = if runs_ns.is_empty() {
            0.0
        } else {
            runs_ns.iter().map(|&n| n as f64).sum::<f64>() / runs_ns.len() as f64
        };
        Self { runs_ns, min_ns, mean_ns }
    }

    pub fn min(&self) -> Duration {
        Duration::from_nanos(self.min_ns)
    }
}

/// Time one call of `f`.
#[inline(never)]
pub fn measure<R>(f: impl FnOnce() -> R) -> (R, Duration) {
    let start = Instant::now();
    let out = black_box(f());
    (out, start.elapsed())
}

/// Call `f` on `state` `warmup` times untimed, then `runs` times timed.
///
/// `setup` runs untimed before every call of `f`. The first error from
/// either aborts the measurement.
pub fn time_runs<S: ?Sized, R>(
    warmup: usize,
    runs: usize,
    state: &mut S,
    mut setup: impl FnMut(&mut S) -> Result<()>,
    mut f: impl FnMut(&mut S) -> Result<R>,
) -> Result<TimingSummary> {
    for _ in 0..warmup {
        setup(state)?;
        black_box(f(state)?);
    }
    let mut samples = Vec::with_capacity(runs);
    for _ in 0..runs {
        setup(state)?;
        let (out, elapsed) = measure(|| f(state));
        out?;
        samples.push(elapsed);
    }
    Ok(TimingSummary::from_runs(samples))
}

fn call_entry<B: Benchmark>(bench: &B, ctx: &mut B::Context, entry: EntryPoint) -> Result<()> {
    match entry {
        EntryPoint::Compute => bench.compute(ctx),
        EntryPoint::Best => bench.best(ctx),
    }
}

/// Time `entry` on `ctx`, redrawing the input with an untimed `reset`
/// before every call.
pub fn time_entry<B: Benchmark>(
    bench: &B,
    ctx: &mut B::Context,
    entry: EntryPoint,
    timing: &TimingConfig,
) -> Result<TimingSummary> {
    let summary = time_runs(
        timing.warmup_runs,
        timing.timed_runs,
        ctx,
        |ctx| bench.reset(ctx),
        |ctx| call_entry(bench, ctx, entry),
    )?;
    debug!(%entry, min_ns = summary.min_ns, mean_ns = summary.mean_ns, "timed entry point");
    Ok(summary)
}
