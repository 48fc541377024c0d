//! Property-based tests for wq-bench
//!
//! - Test mathematical invariants of the metrics
//! - Test reproducibility of seeds and splits
//! - Run with ProptestConfig::with_cases(100)

use std::collections::BTreeMap;

use proptest::prelude::*;
use wq_bench::dataset::split_indices;
use wq_bench::experiment::normalize_importance;
use wq_bench::metrics::{mae, mean, r2, rmse, sample_std};
use wq_bench::seeds::{generate_seeds, SEED_MAX, SEED_MIN};
use wq_bench::trainer::RawImportance;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Generate paired truth/prediction vectors of equal length
fn arb_pairs() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (2usize..50).prop_flat_map(|n| {
        (
            proptest::collection::vec(-100.0f64..100.0, n),
            proptest::collection::vec(-100.0f64..100.0, n),
        )
    })
}

/// Generate raw importances with a clearly non-zero total
fn arb_importances() -> impl Strategy<Value = BTreeMap<String, RawImportance>> {
    proptest::collection::vec((0.001f64..10.0, 0.0f64..1.0), 1..10).prop_map(|values| {
        values
            .into_iter()
            .enumerate()
            .map(|(i, (importance, stddev))| {
                (format!("f{i}"), RawImportance { importance, stddev })
            })
            .collect()
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: the seed sequence has the requested length and range
    #[test]
    fn prop_seeds_length_and_range(master in any::<u64>(), count in 0usize..300) {
        let seeds = generate_seeds(master, count);
        prop_assert_eq!(seeds.len(), count);
        prop_assert!(seeds.iter().all(|s| (SEED_MIN..=SEED_MAX).contains(s)));
    }

    /// Property: the same master seed always yields the same sequence
    #[test]
    fn prop_seeds_deterministic(master in any::<u64>(), count in 1usize..100) {
        prop_assert_eq!(generate_seeds(master, count), generate_seeds(master, count));
    }

    /// Property: a split partitions every row exactly once, deterministically
    #[test]
    fn prop_split_partitions_rows(n in 2usize..500, ratio in 0.01f64..0.5, seed in 1u64..=1000) {
        if let Ok((train, test)) = split_indices(n, ratio, seed) {
            prop_assert!(!train.is_empty());
            prop_assert!(!test.is_empty());

            let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
            all.sort_unstable();
            prop_assert_eq!(all, (0..n).collect::<Vec<_>>());

            let again = split_indices(n, ratio, seed).unwrap();
            prop_assert_eq!(again, (train, test));
        }
    }

    /// Property: normalized importances sum to 1
    #[test]
    fn prop_normalized_importance_sums_to_one(raw in arb_importances()) {
        let normalized = normalize_importance(&raw);
        let sum: f64 = normalized.values().map(|f| f.normalized_importance).sum();
        prop_assert!((sum - 1.0).abs() < 1e-9);
        prop_assert_eq!(normalized.len(), raw.len());
    }

    /// Property: sample std is non-negative and shift-invariant
    #[test]
    fn prop_sample_std_shift_invariant(
        values in proptest::collection::vec(-1000.0f64..1000.0, 2..100),
        shift in -1000.0f64..1000.0,
    ) {
        let std = sample_std(&values).unwrap();
        let shifted: Vec<f64> = values.iter().map(|v| v + shift).collect();
        prop_assert!(std >= 0.0);
        prop_assert!((sample_std(&shifted).unwrap() - std).abs() < 1e-6);
        prop_assert!((mean(&shifted).unwrap() - mean(&values).unwrap() - shift).abs() < 1e-6);
    }

    /// Property: MAE never exceeds RMSE
    #[test]
    fn prop_mae_bounded_by_rmse((y_true, y_pred) in arb_pairs()) {
        let mae = mae(&y_true, &y_pred).unwrap();
        let rmse = rmse(&y_true, &y_pred).unwrap();
        prop_assert!(mae <= rmse + 1e-9);
    }

    /// Property: R² never exceeds 1 and is exactly 1 for perfect predictions
    #[test]
    fn prop_r2_at_most_one((y_true, y_pred) in arb_pairs()) {
        if let Some(score) = r2(&y_true, &y_pred) {
            prop_assert!(score <= 1.0 + 1e-12);
        }
        if let Some(perfect) = r2(&y_true, &y_true) {
            prop_assert!((perfect - 1.0).abs() < 1e-12);
        }
    }
}
