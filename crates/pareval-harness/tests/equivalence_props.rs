//! Property tests for `EquivalenceChecker`.
//!
//! 1. **Reflexivity** – any NaN-free buffer equals itself, including empty ones.
//! 2. **Single flip** – changing one discrete element always fails, at that index.
//! 3. **Inclusive tolerance** – a perturbation within `epsilon` passes, one
//!    well beyond it fails.
//! 4. **Length** – buffers of different length never compare equal.
//! 5. **`equal` agrees with `compare`**.

use pareval_common::{NanPolicy, Tolerance};
use pareval_harness::EquivalenceChecker;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Properties: reflexivity
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_float_buffer_equals_itself(xs in prop::collection::vec(-1e12f64..1e12, 0..256)) {
        let checker = EquivalenceChecker::default();
        prop_assert!(checker.equal(&xs, &xs));
        prop_assert!(checker.compare(&xs, &xs).is_equal());
    }

    #[test]
    fn prop_bool_buffer_equals_itself(xs in prop::collection::vec(any::<bool>(), 0..256)) {
        prop_assert!(EquivalenceChecker::default().equal(&xs, &xs));
    }

    #[test]
    fn prop_nan_buffer_equals_itself_only_when_policy_allows(
        xs in prop::collection::vec(prop::option::of(-100.0f64..100.0), 1..64),
    ) {
        let xs: Vec<f64> = xs.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect();
        let has_nan = xs.iter().any(|x| x.is_nan());
        let strict = EquivalenceChecker::default();
        let lenient = EquivalenceChecker::new(
            Tolerance::default().with_nan_policy(NanPolicy::EqualWhenBothNan),
        );
        prop_assert_eq!(strict.equal(&xs, &xs), !has_nan);
        prop_assert!(lenient.equal(&xs, &xs));
    }
}

// ---------------------------------------------------------------------------
// Properties: discrete single flip
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_single_bool_flip_fails_at_its_index(
        xs in prop::collection::vec(any::<bool>(), 1..256),
        pick in any::<prop::sample::Index>(),
    ) {
        let idx = pick.index(xs.len());
        let mut flipped = xs.clone();
        flipped[idx] = !flipped[idx];

        let checker = EquivalenceChecker::default();
        prop_assert!(!checker.equal(&xs, &flipped));
        let cmp = checker.compare(&xs, &flipped);
        prop_assert_eq!(cmp.mismatched, 1);
        prop_assert_eq!(cmp.first_mismatch.map(|m| m.index), Some(idx));
    }

    #[test]
    fn prop_single_int_change_fails(
        xs in prop::collection::vec(-1000i32..1000, 1..256),
        pick in any::<prop::sample::Index>(),
        delta in 1i32..5,
    ) {
        let idx = pick.index(xs.len());
        let mut changed = xs.clone();
        changed[idx] += delta;
        // Tolerance never applies to discrete values.
        let checker = EquivalenceChecker::new(Tolerance::new(10.0));
        prop_assert!(!checker.equal(&xs, &changed));
    }
}

// ---------------------------------------------------------------------------
// Properties: float tolerance
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_perturbation_within_tolerance_passes(
        xs in prop::collection::vec(-100.0f64..100.0, 1..128),
        pick in any::<prop::sample::Index>(),
        frac in 0.0f64..0.5,
    ) {
        let idx = pick.index(xs.len());
        let mut near = xs.clone();
        near[idx] += frac * 1e-6;
        prop_assert!(EquivalenceChecker::default().equal(&xs, &near));
    }

    #[test]
    fn prop_perturbation_beyond_tolerance_fails(
        xs in prop::collection::vec(-100.0f64..100.0, 1..128),
        pick in any::<prop::sample::Index>(),
        factor in 2.0f64..1e6,
    ) {
        let idx = pick.index(xs.len());
        let mut far = xs.clone();
        far[idx] += factor * 1e-6;
        let checker = EquivalenceChecker::default();
        prop_assert!(!checker.equal(&xs, &far));
        prop_assert_eq!(checker.compare(&xs, &far).first_mismatch.map(|m| m.index), Some(idx));
    }
}

// ---------------------------------------------------------------------------
// Properties: length and consistency
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_length_mismatch_is_unequal(
        xs in prop::collection::vec(-10i64..10, 0..64),
        extra in prop::collection::vec(-10i64..10, 1..8),
    ) {
        let mut longer = xs.clone();
        longer.extend_from_slice(&extra);
        let checker = EquivalenceChecker::default();
        prop_assert!(!checker.equal(&xs, &longer));
        prop_assert!(!checker.equal(&longer, &xs));
        prop_assert_eq!(checker.compare(&xs, &longer).first_mismatch.map(|m| m.index), Some(xs.len()));
    }

    #[test]
    fn prop_equal_agrees_with_compare(
        a in prop::collection::vec(-2.0f32..2.0, 0..64),
        b in prop::collection::vec(-2.0f32..2.0, 0..64),
    ) {
        let checker = EquivalenceChecker::default();
        prop_assert_eq!(checker.equal(&a, &b), checker.compare(&a, &b).is_equal());
    }
}
