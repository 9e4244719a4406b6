//! Per-unit benchmark execution and the JSON report.

use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context as _, Result};
use pareval_collective::{Collective, ThreadGroup};
use pareval_common::{CollectiveError, HarnessConfig};
use pareval_harness::{
    time_entry, Benchmark, Driver, EntryPoint, Kernel, MemorySpace, Problem, StagedSpace,
    TimingSummary, TransferStats, ValidationOutcome,
};
use pareval_kernels::{
    CandidateKind, MapPowersOfTwo, ParallelMap, ParallelScan, PrefixSum, ProblemKind, SerialMap,
    SerialScan,
};
use serde::Serialize;
use tracing::info;

/// What to run.
#[derive(Debug, Clone)]
pub struct Plan {
    pub problem: ProblemKind,
    pub candidate: CandidateKind,
    pub units: usize,
    pub staged: bool,
    pub config: HarnessConfig,
}

/// Everything one unit measured.
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub rank: usize,
    pub seed: u64,
    pub candidate_kernel: String,
    pub validation: ValidationOutcome,
    pub compute: TimingSummary,
    pub best: TimingSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfers: Option<TransferStats>,
}

/// The coordinator's report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub problem: ProblemKind,
    pub candidate: CandidateKind,
    pub units: usize,
    pub space: &'static str,
    pub problem_size: usize,
    pub passed: bool,
    #[serde(flatten)]
    pub coordinator: UnitReport,
}

/// Aborts the world if its unit unwinds, so peers do not wait on a dead
/// thread.
struct AbortOnUnwind(Arc<dyn Collective>);

impl Drop for AbortOnUnwind {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

/// Run `plan` on every unit and return the coordinator's report.
pub fn execute(plan: &Plan) -> Result<Report> {
    let units = ThreadGroup::new(plan.units)?;
    let results: Vec<Result<UnitReport>> = thread::scope(|scope| {
        let handles: Vec<_> = units
            .into_iter()
            .map(|unit| {
                scope.spawn(move || {
                    let collective: Arc<dyn Collective> = Arc::new(unit);
                    let _guard = AbortOnUnwind(Arc::clone(&collective));
                    run_unit(plan, collective)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().map_err(|_| anyhow!("benchmark unit panicked"))?)
            .collect()
    });
    let mut reports = first_failure(results)?;

    let coordinator = reports.swap_remove(0);
    Ok(Report {
        problem: plan.problem,
        candidate: plan.candidate,
        units: plan.units,
        space: if plan.staged { "staged" } else { "host" },
        problem_size: plan.config.problem_size,
        passed: coordinator.validation.passed,
        coordinator,
    })
}

/// All reports, or the error of a unit that failed on its own. Its peers
/// only report that the world was aborted.
fn first_failure(results: Vec<Result<UnitReport>>) -> Result<Vec<UnitReport>> {
    let mut reports = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(err) => errors.push(err),
        }
    }
    if errors.is_empty() {
        return Ok(reports);
    }
    let origin = errors.iter().position(|err| !is_abort(err)).unwrap_or(0);
    Err(errors.swap_remove(origin))
}

fn is_abort(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(cause.downcast_ref::<CollectiveError>(), Some(CollectiveError::Aborted { .. }))
    })
}

fn run_unit(plan: &Plan, collective: Arc<dyn Collective>) -> Result<UnitReport> {
    match plan.problem {
        ProblemKind::ScanPrefixSum => {
            let candidate: Box<dyn Kernel<f64, f64>> = match plan.candidate {
                CandidateKind::Serial => Box::new(SerialScan),
                CandidateKind::Parallel => Box::new(ParallelScan::new()),
            };
            dispatch(plan, PrefixSum::new(), candidate, collective)
        }
        ProblemKind::TransformMapFunction => {
            let candidate: Box<dyn Kernel<i32, bool>> = match plan.candidate {
                CandidateKind::Serial => Box::new(SerialMap),
                CandidateKind::Parallel => Box::new(ParallelMap),
            };
            dispatch(plan, MapPowersOfTwo::new(), candidate, collective)
        }
    }
}

fn dispatch<P: Problem>(
    plan: &Plan,
    problem: P,
    candidate: Box<dyn Kernel<P::Input, P::Output>>,
    collective: Arc<dyn Collective>,
) -> Result<UnitReport> {
    let driver = Driver::new(problem, candidate, plan.config.clone())?.with_collective(collective);
    if plan.staged {
        let space = StagedSpace::new();
        let mut report = lifecycle(&driver.in_space(space.clone()))?;
        report.transfers = Some(space.stats());
        Ok(report)
    } else {
        lifecycle(&driver)
    }
}

/// `init`, timed `compute`, timed `best`, `validate`, `destroy`.
fn lifecycle<P: Problem, S: MemorySpace>(driver: &Driver<P, S>) -> Result<UnitReport> {
    let rank = driver.collective().rank();
    let timing = driver.config().timing;

    let mut ctx = driver.init().context("benchmark init failed")?;
    let compute = time_entry(driver, &mut ctx, EntryPoint::Compute, &timing)
        .context("timing compute failed")?;
    let best =
        time_entry(driver, &mut ctx, EntryPoint::Best, &timing).context("timing best failed")?;
    let validation = driver.validate_detailed(&mut ctx).context("validation failed to run")?;
    let seed = ctx.seed();
    driver.destroy(ctx);

    info!(
        rank,
        passed = validation.passed,
        compute_min_ns = compute.min_ns,
        best_min_ns = best.min_ns,
        "unit finished"
    );
    Ok(UnitReport {
        rank,
        seed,
        candidate_kernel: driver.candidate_name().to_string(),
        validation,
        compute,
        best,
        transfers: None,
    })
}
