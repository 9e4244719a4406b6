//! Benchmark problems for the pareval harness.
//!
//! Each problem module provides a [`Problem`](pareval_harness::Problem)
//! with its serial reference kernel, plus candidate kernels to check
//! against it. [`ProblemKind`] and [`CandidateKind`] name them for the
//! command line.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

pub mod scan;
pub mod transform;

pub use scan::{ParallelScan, PrefixSum, SerialScan};
pub use transform::{MapPowersOfTwo, ParallelMap, SerialMap};

/// Returned when a problem or candidate name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what} '{name}' (expected one of: {expected})")]
pub struct UnknownName {
    pub what: &'static str,
    pub name: String,
    pub expected: String,
}

/// The benchmark problems this crate provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    ScanPrefixSum,
    TransformMapFunction,
}

impl ProblemKind {
    pub const ALL: [ProblemKind; 2] = [ProblemKind::ScanPrefixSum, ProblemKind::TransformMapFunction];

    pub fn slug(self) -> &'static str {
        match self {
            Self::ScanPrefixSum => "scan_prefix_sum",
            Self::TransformMapFunction => "transform_map_function",
        }
    }
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ProblemKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|kind| kind.slug() == wanted).ok_or_else(|| UnknownName {
            what: "problem",
            name: s.to_string(),
            expected: Self::ALL.map(Self::slug).join(", "),
        })
    }
}

/// Which candidate implementation to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    /// Same algorithm as the reference.
    Serial,
    /// Rayon data-parallel implementation.
    #[default]
    Parallel,
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => f.write_str("serial"),
            Self::Parallel => f.write_str("parallel"),
        }
    }
}

impl FromStr for CandidateKind {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" => Ok(Self::Serial),
            "parallel" => Ok(Self::Parallel),
            _ => Err(UnknownName {
                what: "candidate",
                name: s.to_string(),
                expected: "serial, parallel".to_string(),
            }),
        }
    }
}
