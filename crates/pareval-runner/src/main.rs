//! Differential benchmark runner
//!
//! Runs one candidate kernel through the full benchmark lifecycle: timed
//! `compute` runs, timed `best` (reference) runs, randomized validation
//! against the reference, then teardown. The coordinator unit prints a
//! single JSON report on stdout.
//!
//! # Usage
//!
//! ```bash
//! # Parallel prefix sum, single unit
//! pareval --problem scan_prefix_sum
//!
//! # Serial map candidate on four cooperating units, staged through a mirror
//! pareval --problem transform_map_function --candidate serial --units 4 --staged
//!
//! # Settings from a TOML file with a [harness] table, fixed seed
//! pareval --problem scan_prefix_sum --config pareval.toml --seed 42
//! ```
//!
//! `PAREVAL_*` environment variables override the config file; command-line
//! flags override both. The exit status is 1 when validation fails.

mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use pareval_common::HarnessConfig;
use pareval_kernels::{CandidateKind, ProblemKind};
use run::Plan;

/// Validate and time a candidate kernel against its reference
#[derive(Parser, Debug)]
#[command(name = "pareval")]
#[command(about = "Validate and time a candidate kernel against its reference")]
#[command(version)]
struct Args {
    /// Benchmark problem (scan_prefix_sum, transform_map_function)
    #[arg(short, long)]
    problem: ProblemKind,

    /// Candidate implementation (serial, parallel)
    #[arg(long, default_value_t = CandidateKind::Parallel)]
    candidate: CandidateKind,

    /// Number of cooperating execution units
    #[arg(short, long, default_value_t = 1)]
    units: usize,

    /// Run the candidate in a staged memory space with explicit transfers
    #[arg(long)]
    staged: bool,

    /// TOML configuration file with a [harness] table
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RNG seed for input generation
    #[arg(long)]
    seed: Option<u64>,

    /// Elements per timed run
    #[arg(long)]
    problem_size: Option<usize>,

    /// Emit indented JSON
    #[arg(long)]
    pretty: bool,
}

impl Args {
    /// Config file, then environment, then flags.
    fn harness_config(&self) -> Result<HarnessConfig> {
        let base = match &self.config {
            Some(path) => {
                // An explicitly named file must exist.
                anyhow::ensure!(path.is_file(), "config file {} not found", path.display());
                HarnessConfig::from_toml(path)
                    .with_context(|| format!("failed to load config {}", path.display()))?
            }
            None => HarnessConfig::default(),
        };
        let mut config = base.with_env_overrides().context("invalid PAREVAL_* environment")?;
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(size) = self.problem_size {
            config.problem_size = size;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let plan = Plan {
        problem: args.problem,
        candidate: args.candidate,
        units: args.units,
        staged: args.staged,
        config: args.harness_config()?,
    };
    tracing::info!(problem = %plan.problem, candidate = %plan.candidate, units = plan.units, "starting");

    let report = run::execute(&plan)?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");

    Ok(if report.passed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
