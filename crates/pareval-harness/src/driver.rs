//! The benchmark lifecycle: `init`, `reset`, `compute`, `best`, `validate`,
//! `destroy`.

use std::fmt;
use std::sync::Arc;

use pareval_collective::{Collective, ConsensusGate, SingleUnit};
use pareval_common::{Element, HarnessConfig, Result};
use tracing::{debug, info, warn};

use crate::equivalence::EquivalenceChecker;
use crate::kernel::{Kernel, Problem};
use crate::memory::{try_alloc, HostSpace, MemorySpace, SpaceBuffer};
use crate::sampler::InputSampler;
use crate::validation::{self, ValidationOutcome};

/// The uniform contract every benchmark implements.
///
/// `init` hands out a context that the caller owns; every other entry point
/// borrows it, and `destroy` takes it back by value. A destroyed context
/// cannot be used again:
///
/// ```compile_fail
/// use pareval_harness::Benchmark;
///
/// fn use_after_destroy<B: Benchmark>(bench: &B) {
///     let mut ctx = bench.init().unwrap();
///     bench.destroy(ctx);
///     bench.compute(&mut ctx).unwrap();
/// }
/// ```
pub trait Benchmark {
    type Context;

    /// Allocate a context sized to the problem and populate it via `reset`.
    fn init(&self) -> Result<Self::Context>;

    /// Redraw the input and stage it wherever the candidate runs.
    fn reset(&self, ctx: &mut Self::Context) -> Result<()>;

    /// Run the candidate kernel on the current input.
    fn compute(&self, ctx: &mut Self::Context) -> Result<()>;

    /// Run the reference kernel on the current input into its own buffer.
    fn best(&self, ctx: &mut Self::Context) -> Result<()>;

    /// Randomized differential check of candidate against reference.
    ///
    /// A mismatch is `Ok(false)`, not an error.
    fn validate(&self, ctx: &mut Self::Context) -> Result<bool>;

    /// Release the context and everything it owns.
    fn destroy(&self, ctx: Self::Context);
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Input/output pair living in the candidate's memory space.
pub(crate) struct Mirror<I, O> {
    pub(crate) input: SpaceBuffer<I>,
    pub(crate) output: SpaceBuffer<O>,
}

impl<I: Element, O: Element> Mirror<I, O> {
    fn alloc<S: MemorySpace>(space: &S, input_len: usize, output_len: usize) -> Result<Self> {
        Ok(Self {
            input: space.alloc("mirror_input", input_len)?,
            output: space.alloc("mirror_output", output_len)?,
        })
    }
}

/// Where the candidate writes its timed output.
pub(crate) enum Resident<I, O> {
    Host { output: Vec<O> },
    Mirrored(Mirror<I, O>),
}

/// Buffers reused by every validation trial.
pub(crate) struct TrialBuffers<I, O> {
    pub(crate) input: Vec<I>,
    pub(crate) expected: Vec<O>,
    pub(crate) actual: Vec<O>,
    pub(crate) mirror: Option<Mirror<I, O>>,
}

/// All state of one benchmark instance.
///
/// Buffer sizes are fixed when the context is created and never change.
pub struct Context<I, O> {
    pub(crate) input: Vec<I>,
    pub(crate) best_output: Vec<O>,
    pub(crate) resident: Resident<I, O>,
    pub(crate) trial: TrialBuffers<I, O>,
    pub(crate) sampler: InputSampler,
    resets: u64,
}

impl<I, O> Context<I, O> {
    /// Host copy of the most recently drawn input.
    pub fn input(&self) -> &[I] {
        &self.input
    }

    /// Candidate output from the last `compute`, read in its own space.
    pub fn output(&self) -> &[O] {
        match &self.resident {
            Resident::Host { output } => output,
            Resident::Mirrored(mirror) => mirror.output.as_slice(),
        }
    }

    /// Reference output from the last `best`.
    pub fn best_output(&self) -> &[O] {
        &self.best_output
    }

    /// Input the candidate sees, which differs from [`input`](Self::input)
    /// only in where it lives.
    pub fn resident_input(&self) -> &[I] {
        match &self.resident {
            Resident::Host { .. } => &self.input,
            Resident::Mirrored(mirror) => mirror.input.as_slice(),
        }
    }

    pub fn problem_size(&self) -> usize {
        self.input.len()
    }

    pub fn trial_size(&self) -> usize {
        self.trial.input.len()
    }

    pub fn is_mirrored(&self) -> bool {
        matches!(self.resident, Resident::Mirrored(_))
    }

    /// Number of times the input has been drawn, counting the one in `init`.
    pub fn resets(&self) -> u64 {
        self.resets
    }

    pub fn seed(&self) -> u64 {
        self.sampler.seed()
    }
}

impl<I, O> fmt::Debug for Context<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("problem_size", &self.input.len())
            .field("trial_size", &self.trial.input.len())
            .field("mirrored", &self.is_mirrored())
            .field("resets", &self.resets)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Runs one candidate kernel against one problem's reference.
pub struct Driver<P: Problem, S: MemorySpace = HostSpace> {
    pub(crate) problem: P,
    pub(crate) candidate: Box<dyn Kernel<P::Input, P::Output>>,
    pub(crate) config: HarnessConfig,
    pub(crate) checker: EquivalenceChecker,
    pub(crate) gate: ConsensusGate,
    pub(crate) space: S,
}

impl<P: Problem> Driver<P, HostSpace> {
    /// Single-unit, host-memory driver.
    ///
    /// Fails if `config` does not validate.
    pub fn new<K>(problem: P, candidate: K, config: HarnessConfig) -> Result<Self>
    where
        K: Kernel<P::Input, P::Output> + 'static,
    {
        config.validate()?;
        let checker = EquivalenceChecker::new(config.tolerance_policy());
        Ok(Self {
            problem,
            candidate: Box::new(candidate),
            config,
            checker,
            gate: ConsensusGate::new(Arc::new(SingleUnit)),
            space: HostSpace,
        })
    }
}

impl<P: Problem, S: MemorySpace> Driver<P, S> {
    /// Participate in a multi-unit world.
    pub fn with_collective(mut self, collective: Arc<dyn Collective>) -> Self {
        self.gate = ConsensusGate::new(collective);
        self
    }

    /// Run the candidate in another memory space.
    pub fn in_space<T: MemorySpace>(self, space: T) -> Driver<P, T> {
        Driver {
            problem: self.problem,
            candidate: self.candidate,
            config: self.config,
            checker: self.checker,
            gate: self.gate,
            space,
        }
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn candidate_name(&self) -> &str {
        self.candidate.name()
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn checker(&self) -> &EquivalenceChecker {
        &self.checker
    }

    pub fn collective(&self) -> &Arc<dyn Collective> {
        self.gate.collective()
    }

    pub fn space(&self) -> &S {
        &self.space
    }

    /// Like [`Benchmark::validate`] but reports how the run ended.
    pub fn validate_detailed(
        &self,
        ctx: &mut Context<P::Input, P::Output>,
    ) -> Result<ValidationOutcome> {
        self.abort_on_err(validation::run_trials(self, ctx))
    }

    /// Abort the collective on a local failure so peers stop waiting for
    /// this unit.
    fn abort_on_err<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            let collective = self.gate.collective();
            warn!(rank = collective.rank(), error = %err, "benchmark unit failed");
            collective.abort();
        }
        result
    }

    fn try_init(&self) -> Result<Context<P::Input, P::Output>> {
        let n = self.config.problem_size;
        let trial_n = self.config.trial_size;
        let out_n = self.problem.output_len(n);
        let trial_out_n = self.problem.output_len(trial_n);
        let mirrored = self.space.requires_mirror();

        let resident = if mirrored {
            Resident::Mirrored(Mirror::alloc(&self.space, n, out_n)?)
        } else {
            Resident::Host { output: try_alloc("output", out_n)? }
        };
        let trial = TrialBuffers {
            input: try_alloc("trial_input", trial_n)?,
            expected: try_alloc("trial_expected", trial_out_n)?,
            actual: try_alloc("trial_actual", trial_out_n)?,
            mirror: if mirrored {
                Some(Mirror::alloc(&self.space, trial_n, trial_out_n)?)
            } else {
                None
            },
        };

        let mut ctx = Context {
            input: try_alloc("input", n)?,
            best_output: try_alloc("best_output", out_n)?,
            resident,
            trial,
            sampler: InputSampler::new(self.config.seed),
            resets: 0,
        };
        info!(
            problem = self.problem.name(),
            candidate = self.candidate.name(),
            space = self.space.name(),
            problem_size = n,
            trial_size = trial_n,
            seed = ctx.sampler.seed(),
            "benchmark context initialised"
        );
        self.redraw(&mut ctx)?;
        Ok(ctx)
    }

    fn redraw(&self, ctx: &mut Context<P::Input, P::Output>) -> Result<()> {
        self.draw(&mut ctx.sampler, &mut ctx.input)?;
        if let Resident::Mirrored(mirror) = &mut ctx.resident {
            self.space.upload(&ctx.input, &mut mirror.input)?;
        }
        ctx.resets += 1;
        debug!(resets = ctx.resets, "input redrawn");
        Ok(())
    }

    /// Draw fresh input into `buf` on the coordinator and share it.
    pub(crate) fn draw(
        &self,
        sampler: &mut InputSampler,
        buf: &mut [P::Input],
    ) -> Result<()> {
        let (low, high) = self.problem.input_bounds();
        sampler.fill_shared(self.gate.collective().as_ref(), buf, low, high)?;
        Ok(())
    }

    /// Candidate run with mirroring when the space needs it.
    pub(crate) fn run_candidate(
        &self,
        input: &[P::Input],
        mirror: Option<&mut Mirror<P::Input, P::Output>>,
        output: &mut [P::Output],
    ) -> Result<()> {
        match mirror {
            Some(mirror) => {
                self.space.upload(input, &mut mirror.input)?;
                self.candidate.run(mirror.input.as_slice(), mirror.output.as_mut_slice())?;
                self.space.download(&mirror.output, output)?;
            }
            None => self.candidate.run(input, output)?,
        }
        Ok(())
    }
}

impl<P: Problem, S: MemorySpace> Benchmark for Driver<P, S> {
    type Context = Context<P::Input, P::Output>;

    fn init(&self) -> Result<Self::Context> {
        self.abort_on_err(self.try_init())
    }

    fn reset(&self, ctx: &mut Self::Context) -> Result<()> {
        self.abort_on_err(self.redraw(ctx))
    }

    fn compute(&self, ctx: &mut Self::Context) -> Result<()> {
        let result = match &mut ctx.resident {
            Resident::Host { output } => self.candidate.run(&ctx.input, output),
            Resident::Mirrored(mirror) => {
                self.candidate.run(mirror.input.as_slice(), mirror.output.as_mut_slice())
            }
        };
        self.abort_on_err(result.map_err(Into::into))
    }

    fn best(&self, ctx: &mut Self::Context) -> Result<()> {
        let result = self.problem.reference().run(&ctx.input, &mut ctx.best_output);
        self.abort_on_err(result.map_err(Into::into))
    }

    fn validate(&self, ctx: &mut Self::Context) -> Result<bool> {
        Ok(self.validate_detailed(ctx)?.passed)
    }

    fn destroy(&self, ctx: Self::Context) {
        info!(
            problem = self.problem.name(),
            resets = ctx.resets,
            "benchmark context released"
        );
        drop(ctx);
    }
}

impl<P: Problem, S: MemorySpace> fmt::Debug for Driver<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("problem", &self.problem.name())
            .field("candidate", &self.candidate.name())
            .field("space", &self.space)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

