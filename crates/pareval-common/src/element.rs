//! Value domains a benchmark buffer may hold.
//!
//! Every buffer element type implements [`Element`], which bundles the three
//! things the harness needs from a value: drawing it uniformly at random,
//! moving it losslessly across execution units, and comparing a candidate
//! value against a reference value under the right policy for its domain.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Comparison domain of an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Integers and booleans: compared exactly.
    Discrete,
    /// Floating point: compared within a [`Tolerance`].
    Float,
}

/// How NaN values compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NanPolicy {
    /// A NaN on either side is a mismatch.
    #[default]
    Unequal,
    /// NaN matches NaN, and nothing else.
    EqualWhenBothNan,
}

impl fmt::Display for NanPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unequal => write!(f, "unequal"),
            Self::EqualWhenBothNan => write!(f, "equal_when_both_nan"),
        }
    }
}

impl FromStr for NanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unequal" => Ok(Self::Unequal),
            "equal_when_both_nan" | "equal-when-both-nan" => Ok(Self::EqualWhenBothNan),
            other => Err(format!("unknown NaN policy: {other}")),
        }
    }
}

/// How `epsilon` bounds the difference between two finite floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceMode {
    /// `|expected - actual| <= epsilon`.
    #[default]
    Absolute,
    /// `|expected - actual| <= epsilon * max(1, |expected|)`.
    Relative,
}

impl fmt::Display for ToleranceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute => write!(f, "absolute"),
            Self::Relative => write!(f, "relative"),
        }
    }
}

impl FromStr for ToleranceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "absolute" | "abs" => Ok(Self::Absolute),
            "relative" | "rel" => Ok(Self::Relative),
            other => Err(format!("unknown tolerance mode: {other}")),
        }
    }
}

/// Floating-point comparison policy.
///
/// By default two finite values match when `|expected - actual| <= epsilon`.
/// The bound is inclusive: a difference of exactly `epsilon` still matches.
/// [`ToleranceMode::Relative`] scales the bound by `max(1, |expected|)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub epsilon: f64,
    #[serde(default)]
    pub mode: ToleranceMode,
    #[serde(default)]
    pub nan_policy: NanPolicy,
}

impl Tolerance {
    /// Default comparison scale.
    pub const DEFAULT_EPSILON: f64 = 1e-6;

    pub const fn new(epsilon: f64) -> Self {
        Self { epsilon, mode: ToleranceMode::Absolute, nan_policy: NanPolicy::Unequal }
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: ToleranceMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub const fn with_nan_policy(mut self, nan_policy: NanPolicy) -> Self {
        self.nan_policy = nan_policy;
        self
    }

    /// Compare two floating-point values under this policy.
    pub fn floats_match(&self, expected: f64, actual: f64) -> bool {
        if expected.is_nan() || actual.is_nan() {
            return self.nan_policy == NanPolicy::EqualWhenBothNan
                && expected.is_nan()
                && actual.is_nan();
        }
        if expected == actual {
            return true;
        }
        if !expected.is_finite() || !actual.is_finite() {
            return false;
        }
        let bound = match self.mode {
            ToleranceMode::Absolute => self.epsilon,
            ToleranceMode::Relative => self.epsilon * expected.abs().max(1.0),
        };
        (expected - actual).abs() <= bound
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(Self::DEFAULT_EPSILON)
    }
}

/// A value that can live in a benchmark buffer.
pub trait Element: Copy + Send + Sync + PartialEq + fmt::Debug + Default + 'static {
    const KIND: ElementKind;

    /// Lossless wire representation used for broadcasts.
    fn to_word(self) -> u64;

    fn from_word(word: u64) -> Self;

    /// Draw one value uniformly from `[low, high)`.
    ///
    /// `bool` ignores the half-open reading: distinct bounds give a fair
    /// coin, equal bounds give that value.
    ///
    /// # Panics
    ///
    /// Panics if the range is empty for a numeric type.
    fn sample<R: Rng + ?Sized>(rng: &mut R, low: Self, high: Self) -> Self;

    /// Does `actual` match `expected` under `tolerance`?
    ///
    /// Discrete types ignore `tolerance` and compare exactly.
    fn matches(expected: Self, actual: Self, tolerance: &Tolerance) -> bool;

    /// Absolute difference as `f64`, for mismatch reporting.
    fn abs_diff(expected: Self, actual: Self) -> f64;
}

impl Element for bool {
    const KIND: ElementKind = ElementKind::Discrete;

    fn to_word(self) -> u64 {
        u64::from(self)
    }

    fn from_word(word: u64) -> Self {
        word != 0
    }

    fn sample<R: Rng + ?Sized>(rng: &mut R, low: Self, high: Self) -> Self {
        if low == high {
            low
        } else {
            rng.random()
        }
    }

    fn matches(expected: Self, actual: Self, _tolerance: &Tolerance) -> bool {
        expected == actual
    }

    fn abs_diff(expected: Self, actual: Self) -> f64 {
        if expected == actual {
            0.0
        } else {
            1.0
        }
    }
}

macro_rules! impl_integer_element {
    ($($ty:ty => $unsigned:ty),* $(,)?) => {$(
        impl Element for $ty {
            const KIND: ElementKind = ElementKind::Discrete;

            #[allow(clippy::cast_sign_loss, clippy::cast_lossless)]
            fn to_word(self) -> u64 {
                self as $unsigned as u64
            }

            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            fn from_word(word: u64) -> Self {
                word as $unsigned as $ty
            }

            fn sample<R: Rng + ?Sized>(rng: &mut R, low: Self, high: Self) -> Self {
                rng.random_range(low..high)
            }

            fn matches(expected: Self, actual: Self, _tolerance: &Tolerance) -> bool {
                expected == actual
            }

            #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
            fn abs_diff(expected: Self, actual: Self) -> f64 {
                (expected as f64 - actual as f64).abs()
            }
        }
    )*};
}

impl_integer_element!(i32 => u32, i64 => u64, u32 => u32, u64 => u64);

impl Element for f32 {
    const KIND: ElementKind = ElementKind::Float;

    fn to_word(self) -> u64 {
        u64::from(self.to_bits())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_word(word: u64) -> Self {
        f32::from_bits(word as u32)
    }

    fn sample<R: Rng + ?Sized>(rng: &mut R, low: Self, high: Self) -> Self {
        rng.random_range(low..high)
    }

    fn matches(expected: Self, actual: Self, tolerance: &Tolerance) -> bool {
        tolerance.floats_match(f64::from(expected), f64::from(actual))
    }

    fn abs_diff(expected: Self, actual: Self) -> f64 {
        (f64::from(expected) - f64::from(actual)).abs()
    }
}

impl Element for f64 {
    const KIND: ElementKind = ElementKind::Float;

    fn to_word(self) -> u64 {
        self.to_bits()
    }

    fn from_word(word: u64) -> Self {
        f64::from_bits(word)
    }

    fn sample<R: Rng + ?Sized>(rng: &mut R, low: Self, high: Self) -> Self {
        rng.random_range(low..high)
    }

    fn matches(expected: Self, actual: Self, tolerance: &Tolerance) -> bool {
        tolerance.floats_match(expected, actual)
    }

    fn abs_diff(expected: Self, actual: Self) -> f64 {
        (expected - actual).abs()
    }
}
