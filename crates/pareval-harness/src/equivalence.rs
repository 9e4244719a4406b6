//! Output comparison between a reference and a candidate kernel.

use pareval_common::{Element, ElementKind, Tolerance};
use serde::Serialize;

/// What went wrong at the first differing position.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MismatchKind {
    /// The buffers have different lengths.
    Length { expected: usize, actual: usize },
    /// The values at `index` differ beyond the comparison policy.
    Value { expected: String, actual: String, abs_diff: f64 },
}

/// First position at which two buffers disagree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    pub index: usize,
    #[serde(flatten)]
    pub kind: MismatchKind,
}

/// Full comparison of two buffers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// Positions compared (the shorter length).
    pub compared: usize,
    /// Positions that failed the policy.
    pub mismatched: usize,
    pub first_mismatch: Option<Mismatch>,
    /// Largest `|expected - actual|` over compared positions (NaN ignored).
    pub max_abs_diff: f64,
}

impl Comparison {
    pub fn is_equal(&self) -> bool {
        self.first_mismatch.is_none()
    }
}

/// Compares output buffers under the policy of their element type.
///
/// Discrete elements (integers, booleans) must match exactly; floats must
/// match within the configured [`Tolerance`]. Buffers of different length
/// are never equal; two empty buffers always are.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EquivalenceChecker {
    tolerance: Tolerance,
}

impl EquivalenceChecker {
    pub fn new(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> &Tolerance {
        &self.tolerance
    }

    /// `true` iff every element of `actual` matches `expected`.
    ///
    /// Stops at the first mismatch.
    pub fn equal<T: Element>(&self, expected: &[T], actual: &[T]) -> bool {
        expected.len() == actual.len()
            && expected.iter().zip(actual).all(|(&e, &a)| T::matches(e, a, &self.tolerance))
    }

    /// Compare every position and report the first mismatch.
    pub fn compare<T: Element>(&self, expected: &[T], actual: &[T]) -> Comparison {
        let compared = expected.len().min(actual.len());
        let mut mismatched = 0;
        let mut first_mismatch = None;
        let mut max_abs_diff = 0.0f64;

        for (index, (&e, &a)) in expected.iter().zip(actual).enumerate() {
            let diff = T::abs_diff(e, a);
            max_abs_diff = max_abs_diff.max(diff);
            if !T::matches(e, a, &self.tolerance) {
                mismatched += 1;
                if first_mismatch.is_none() {
                    first_mismatch = Some(Mismatch {
                        index,
                        kind: MismatchKind::Value {
                            expected: format!("{e:?}"),
                            actual: format!("{a:?}"),
                            abs_diff: diff,
                        },
                    });
                }
            }
        }

        if expected.len() != actual.len() && first_mismatch.is_none() {
            first_mismatch = Some(Mismatch {
                index: compared,
                kind: MismatchKind::Length { expected: expected.len(), actual: actual.len() },
            });
        }

        Comparison { compared, mismatched, first_mismatch, max_abs_diff }
    }

    /// Whether `T` is compared exactly.
    pub fn is_exact<T: Element>(&self) -> bool {
        T::KIND == ElementKind::Discrete
    }
}
