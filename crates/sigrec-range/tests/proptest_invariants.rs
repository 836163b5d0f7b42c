// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use sigrec_core::AnalysisTool;
use sigrec_range::{RangeConfig, RangeEstimator};

const MIN_PROPTEST_CASES: u32 = 32;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: proptest_cases(),
        failure_persistence: Some(Box::new(FileFailurePersistence::Off)),
        ..ProptestConfig::default()
    }
}

fn extent(data: &[f64]) -> (f64, f64) {
    (
        data.iter().copied().fold(f64::INFINITY, f64::min),
        data.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    )
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn bound_is_ordered_and_inside_the_data(
        data in prop::collection::vec(-500.0_f64..500.0, 11..150),
    ) {
        let estimator = RangeEstimator::new(RangeConfig::default()).expect("default config");
        let bound = estimator.call(&data).expect("finite data must be estimated");
        let (lo, hi) = extent(&data);
        prop_assert!(bound.lower <= bound.upper);
        prop_assert!(bound.lower >= lo && bound.upper <= hi);
    }

    #[test]
    fn few_distinct_values_return_the_exact_extent(
        levels in prop::collection::vec(-50.0_f64..50.0, 1..=10),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 1..100),
    ) {
        let data: Vec<f64> = picks.iter().map(|idx| levels[idx.index(levels.len())]).collect();
        let estimator = RangeEstimator::new(RangeConfig::default()).expect("default config");
        let bound = estimator.call(&data).expect("discrete data must not fail");
        prop_assert_eq!(bound.as_array(), [extent(&data).0, extent(&data).1]);
    }
}
