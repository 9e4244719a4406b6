//! Error types for the pareval harness.
//!
//! A failed validation is *not* an error: `validate` reports it as
//! `Ok(false)`. The variants here cover configuration problems, kernels that
//! report a failure through their `Result`, collective-communication
//! failures, and buffer allocation failures at `init`.

use thiserror::Error;

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("invalid environment variable value for {key}: {value}")]
    InvalidEnvVar { key: String, value: String },

    #[error("validation error: {0}")]
    Validation(String),
}

/// Errors a kernel may report instead of producing output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error("buffer length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("kernel {kernel} failed: {reason}")]
    Failed { kernel: String, reason: String },
}

impl KernelError {
    /// Fail with `LengthMismatch` unless `actual == expected`.
    pub fn check_len(expected: usize, actual: usize) -> std::result::Result<(), KernelError> {
        if expected == actual {
            Ok(())
        } else {
            Err(KernelError::LengthMismatch { expected, actual })
        }
    }
}

/// Errors from the multi-unit runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectiveError {
    #[error("invalid world: {0}")]
    InvalidWorld(String),

    #[error("broadcast length mismatch on rank {rank}: expected {expected}, got {actual}")]
    LengthMismatch { rank: usize, expected: usize, actual: usize },

    #[error("collective state poisoned: a peer unit panicked")]
    Poisoned,

    #[error("collective aborted by rank {rank}")]
    Aborted { rank: usize },
}

/// Top-level harness error.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("collective error: {0}")]
    Collective(#[from] CollectiveError),

    #[error("failed to allocate {elements} elements for buffer '{buffer}'")]
    Allocation { buffer: &'static str, elements: usize },

    #[error("transfer to/from {space} mismatched: host {host} elements, space {resident} elements")]
    TransferLength { space: &'static str, host: usize, resident: usize },
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, HarnessError>;
