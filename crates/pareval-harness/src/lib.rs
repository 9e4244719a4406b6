//! Differential benchmark harness.
//!
//! A [`Driver`] pairs a [`Problem`] (input distribution plus trusted
//! reference kernel) with a candidate [`Kernel`] and exposes the
//! [`Benchmark`] lifecycle. [`Benchmark::validate`] runs randomized trials
//! comparing candidate and reference output; [`timing`] measures the
//! `compute` and `best` entry points.
//!
//! ```
//! use pareval_common::{HarnessConfig, KernelError};
//! use pareval_harness::{kernel_fn, Benchmark, Driver, Kernel, Problem};
//!
//! struct Negate {
//!     reference: Box<dyn Kernel<i64, i64>>,
//! }
//!
//! impl Problem for Negate {
//!     type Input = i64;
//!     type Output = i64;
//!     fn name(&self) -> &str {
//!         "negate"
//!     }
//!     fn input_bounds(&self) -> (i64, i64) {
//!         (-1000, 1000)
//!     }
//!     fn reference(&self) -> &dyn Kernel<i64, i64> {
//!         self.reference.as_ref()
//!     }
//! }
//!
//! fn negate(input: &[i64], output: &mut [i64]) -> Result<(), KernelError> {
//!     KernelError::check_len(input.len(), output.len())?;
//!     for (o, i) in output.iter_mut().zip(input) {
//!         *o = -i;
//!     }
//!     Ok(())
//! }
//!
//! let problem = Negate { reference: Box::new(kernel_fn("serial", negate)) };
//! let config = HarnessConfig::default().with_problem_size(4096).with_seed(7);
//! let driver = Driver::new(problem, kernel_fn("candidate", negate), config)?;
//!
//! let mut ctx = driver.init()?;
//! driver.compute(&mut ctx)?;
//! assert!(driver.validate(&mut ctx)?);
//! driver.destroy(ctx);
//! # Ok::<(), pareval_common::HarnessError>(())
//! ```

pub mod driver;
pub mod equivalence;
pub mod kernel;
pub mod memory;
pub mod sampler;
pub mod timing;
pub mod validation;

pub use driver::{Benchmark, Context, Driver};
pub use equivalence::{Comparison, EquivalenceChecker, Mismatch, MismatchKind};
pub use kernel::{kernel_fn, FnKernel, Kernel, Problem};
pub use memory::{try_alloc, HostSpace, MemorySpace, SpaceBuffer, StagedSpace, TransferStats};
pub use sampler::InputSampler;
pub use timing::{measure, time_entry, time_runs, EntryPoint, TimingSummary};
pub use validation::{TrialPhase, ValidationOutcome};
