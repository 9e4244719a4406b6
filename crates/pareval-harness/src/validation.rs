//! Randomized differential validation.
//!
//! Each trial draws a fresh trial-sized input on the coordinator, shares it
//! with every unit, runs the reference and the candidate on it, compares the
//! two outputs locally, and then agrees on one verdict across units. The
//! loop stops after the first trial whose agreed verdict is a failure, so
//! every unit runs the same number of trials.

use std::fmt;

use pareval_common::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::driver::{Context, Driver};
use crate::equivalence::Mismatch;
use crate::kernel::Problem;
use crate::memory::MemorySpace;

/// Where a trial currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    TrialStart,
    InputDrawn,
    ReferenceComputed,
    CandidateComputed,
    Compared,
    ConsensusReached,
    TrialEnd,
}

impl fmt::Display for TrialPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::TrialStart => "trial_start",
            Self::InputDrawn => "input_drawn",
            Self::ReferenceComputed => "reference_computed",
            Self::CandidateComputed => "candidate_computed",
            Self::Compared => "compared",
            Self::ConsensusReached => "consensus_reached",
            Self::TrialEnd => "trial_end",
        };
        f.write_str(s)
    }
}

/// How a validation run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    /// Agreed verdict across all units.
    pub passed: bool,
    /// Trials executed, including the failing one.
    pub trials_run: usize,
    /// Zero-based index of the trial that failed.
    pub failed_trial: Option<usize>,
    /// First local mismatch on this unit. `None` when this unit matched
    /// but a peer did not.
    pub mismatch: Option<Mismatch>,
}

fn phase(trial: usize, phase: TrialPhase) {
    debug!(trial, %phase, "validation");
}

pub(crate) fn run_trials<P, S>(
    driver: &Driver<P, S>,
    ctx: &mut Context<P::Input, P::Output>,
) -> Result<ValidationOutcome>
where
    P: Problem,
    S: MemorySpace,
{
    let attempts = driver.config.max_validation_attempts;
    let collective = driver.gate.collective();
    let reference = driver.problem.reference();

    for trial in 0..attempts {
        phase(trial, TrialPhase::TrialStart);

        let buffers = &mut ctx.trial;
        driver.draw(&mut ctx.sampler, &mut buffers.input)?;
        phase(trial, TrialPhase::InputDrawn);

        reference.run(&buffers.input, &mut buffers.expected)?;
        phase(trial, TrialPhase::ReferenceComputed);

        driver.run_candidate(&buffers.input, buffers.mirror.as_mut(), &mut buffers.actual)?;
        collective.barrier()?;
        phase(trial, TrialPhase::CandidateComputed);

        let comparison = driver.checker.compare(&buffers.expected, &buffers.actual);
        phase(trial, TrialPhase::Compared);

        let agreed = driver.gate.agree(comparison.is_equal())?;
        phase(trial, TrialPhase::ConsensusReached);

        if !agreed {
            warn!(
                problem = driver.problem.name(),
                candidate = driver.candidate.name(),
                rank = collective.rank(),
                trial,
                mismatch = ?comparison.first_mismatch,
                max_abs_diff = comparison.max_abs_diff,
                "validation failed"
            );
            return Ok(ValidationOutcome {
                passed: false,
                trials_run: trial + 1,
                failed_trial: Some(trial),
                mismatch: comparison.first_mismatch,
            });
        }
        phase(trial, TrialPhase::TrialEnd);
    }

    info!(
        problem = driver.problem.name(),
        candidate = driver.candidate.name(),
        trials = attempts,
        "validation passed"
    );
    Ok(ValidationOutcome { passed: true, trials_run: attempts, failed_trial: None, mismatch: None })
}
