//! Common types for the pareval kernel-evaluation harness
//!
//! This crate provides the foundational pieces shared by every other
//! pareval crate: the harness configuration, the error taxonomy, and the
//! [`Element`] trait describing which value domains a benchmark buffer may
//! hold.

pub mod config;
pub mod element;
pub mod error;

pub use config::*;
pub use element::{Element, ElementKind, NanPolicy, Tolerance, ToleranceMode};
pub use error::*;
