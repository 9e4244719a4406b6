//! Harness configuration with TOML, environment variable, and default
//! sources.
//!
//! The problem size and validation-attempt cap travel inside an explicit
//! [`HarnessConfig`] handed to each driver, so several benchmark instances
//! with different settings can coexist in one process.

use std::path::Path;
use std::{env, fs};

use serde::{Deserialize, Serialize};

use crate::element::{NanPolicy, Tolerance, ToleranceMode};
use crate::error::ConfigError;

/// Timed-run settings consumed by the timing harness, not by drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Untimed calls made before measurement starts.
    pub warmup_runs: usize,
    /// Timed calls recorded per entry point.
    pub timed_runs: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { warmup_runs: 1, timed_runs: 5 }
    }
}

/// Configuration for one benchmark instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Elements processed by timed `compute`/`best` runs.
    pub problem_size: usize,
    /// Elements per validation trial.
    pub trial_size: usize,
    /// Maximum number of randomized validation trials.
    pub max_validation_attempts: usize,
    /// Floating-point comparison bound.
    pub tolerance: f64,
    pub tolerance_mode: ToleranceMode,
    pub nan_policy: NanPolicy,
    /// Fixed RNG seed; `None` draws a fresh seed per sampler.
    pub seed: Option<u64>,
    pub timing: TimingConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            problem_size: 1 << 20,
            trial_size: 1024,
            max_validation_attempts: 10,
            tolerance: Tolerance::DEFAULT_EPSILON,
            tolerance_mode: ToleranceMode::Absolute,
            nan_policy: NanPolicy::Unequal,
            seed: None,
            timing: TimingConfig::default(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TomlWrapper {
    #[serde(default)]
    harness: HarnessConfig,
}

impl HarnessConfig {
    // ── Constructors ────────────────────────────────────────────

    /// Load configuration from a TOML file with a `[harness]` table.
    ///
    /// A missing file yields `Self::default()`.
    pub fn from_toml(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::warn!("config file not found: {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let wrapper: TomlWrapper = toml::from_str(text)?;
        Ok(wrapper.harness)
    }

    /// Serialize to a TOML string wrapped in `[harness]`.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        let wrapper = TomlWrapper { harness: self.clone() };
        Ok(toml::to_string_pretty(&wrapper)?)
    }

    /// Defaults overlaid with `PAREVAL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Overlay `PAREVAL_*` environment variables on top of `self`.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(v) = env::var("PAREVAL_PROBLEM_SIZE") {
            self.problem_size = parse_env("PAREVAL_PROBLEM_SIZE", &v)?;
        }
        if let Ok(v) = env::var("PAREVAL_TRIAL_SIZE") {
            self.trial_size = parse_env("PAREVAL_TRIAL_SIZE", &v)?;
        }
        if let Ok(v) = env::var("PAREVAL_MAX_VALIDATION_ATTEMPTS") {
            self.max_validation_attempts = parse_env("PAREVAL_MAX_VALIDATION_ATTEMPTS", &v)?;
        }
        if let Ok(v) = env::var("PAREVAL_TOLERANCE") {
            self.tolerance = parse_env("PAREVAL_TOLERANCE", &v)?;
        }
        if let Ok(v) = env::var("PAREVAL_TOLERANCE_MODE") {
            self.tolerance_mode = parse_env("PAREVAL_TOLERANCE_MODE", &v)?;
        }
        if let Ok(v) = env::var("PAREVAL_NAN_POLICY") {
            self.nan_policy = parse_env("PAREVAL_NAN_POLICY", &v)?;
        }
        if let Ok(v) = env::var("PAREVAL_SEED") {
            self.seed = Some(parse_env("PAREVAL_SEED", &v)?);
        }
        if let Ok(v) = env::var("PAREVAL_WARMUP_RUNS") {
            self.timing.warmup_runs = parse_env("PAREVAL_WARMUP_RUNS", &v)?;
        }
        if let Ok(v) = env::var("PAREVAL_TIMED_RUNS") {
            self.timing.timed_runs = parse_env("PAREVAL_TIMED_RUNS", &v)?;
        }
        Ok(self)
    }

    // ── Builders ────────────────────────────────────────────────

    #[must_use]
    pub fn with_problem_size(mut self, problem_size: usize) -> Self {
        self.problem_size = problem_size;
        self
    }

    #[must_use]
    pub fn with_trial_size(mut self, trial_size: usize) -> Self {
        self.trial_size = trial_size;
        self
    }

    #[must_use]
    pub fn with_max_validation_attempts(mut self, attempts: usize) -> Self {
        self.max_validation_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Comparison policy for floating-point outputs.
    pub fn tolerance_policy(&self) -> Tolerance {
        Tolerance::new(self.tolerance)
            .with_mode(self.tolerance_mode)
            .with_nan_policy(self.nan_policy)
    }

    // ── Validation ──────────────────────────────────────────────

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.problem_size == 0 {
            return Err(ConfigError::Validation("problem_size must be >= 1".into()));
        }
        if self.trial_size == 0 {
            return Err(ConfigError::Validation("trial_size must be >= 1".into()));
        }
        if self.max_validation_attempts == 0 {
            return Err(ConfigError::Validation("max_validation_attempts must be >= 1".into()));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigError::Validation(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        if self.timing.timed_runs == 0 {
            return Err(ConfigError::Validation("timing.timed_runs must be >= 1".into()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvVar { key: key.to_string(), value: value.to_string() })
}
