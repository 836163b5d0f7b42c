// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use sigrec_breaks::{BreakConfig, BreakOptimizer, KSelection};
use sigrec_core::{AnalysisError, AnalysisTool};

fn lcg_next(state: &mut u64) -> f64 {
    *state = state
        .wrapping_mul(6_364_136_223_846_793_005)
        .wrapping_add(1_442_695_040_888_963_407);
    // (0, 1], never zero so the logarithm below stays finite
    ((*state >> 11) as f64 + 1.0) / (1_u64 << 53) as f64
}

fn gaussian(state: &mut u64, mean: f64, std: f64) -> f64 {
    let u1 = lcg_next(state);
    let u2 = lcg_next(state);
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std * z
}

fn bimodal(seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut state = seed;
    let low: Vec<f64> = (0..1_000).map(|_| gaussian(&mut state, 0.0, 1.0)).collect();
    let high: Vec<f64> = (0..1_000).map(|_| gaussian(&mut state, 10.0, 1.0)).collect();
    (low, high)
}

fn optimizer() -> BreakOptimizer {
    BreakOptimizer::new(BreakConfig::default()).expect("default config should be valid")
}

#[test]
fn bimodal_distribution_gets_a_boundary_between_the_modes() {
    let (low, high) = bimodal(17);
    let low_max = low.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let high_min = high.iter().copied().fold(f64::INFINITY, f64::min);
    assert!(low_max < high_min, "generated modes should not overlap");

    let mut data = low;
    data.extend(high);
    let analysis = optimizer().analyze(&data).expect("bimodal data should classify");
    let breaks = analysis.value;

    assert!(!breaks.is_empty(), "a bimodal sample needs at least one boundary");
    assert!(breaks.windows(2).all(|w| w[0] <= w[1]));
    assert!(
        breaks.iter().any(|&b| b >= low_max && b < high_min && b > 0.0 && b < 10.0),
        "no boundary separates the modes: {breaks:?}"
    );
    assert_eq!(analysis.diagnostics.n, 2_000);
}

#[test]
fn bic_selection_also_separates_the_modes() {
    let (low, high) = bimodal(5);
    let low_max = low.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut data = low;
    data.extend(high);

    let opt = BreakOptimizer::new(BreakConfig {
        selection: KSelection::Bic,
        ..BreakConfig::default()
    })
    .expect("config should be valid");
    let breaks = opt.call(&data).expect("bimodal data should classify");
    assert!(breaks.contains(&low_max), "{breaks:?} should include {low_max}");
}

#[test]
fn repeated_calls_are_bit_identical() {
    let (mut data, high) = bimodal(99);
    data.extend(high);
    let opt = optimizer();
    let first = opt.call(&data).expect("first call");
    let second = opt.call(&data).expect("second call");
    assert_eq!(
        first.iter().map(|b| b.to_bits()).collect::<Vec<_>>(),
        second.iter().map(|b| b.to_bits()).collect::<Vec<_>>()
    );
}

#[test]
fn near_discrete_data_is_idempotently_empty() {
    let data: Vec<f64> = (0..500).map(|i| (i % 5) as f64).collect();
    let opt = optimizer();
    for _ in 0..3 {
        assert!(opt.call(&data).expect("discrete data must not fail").is_empty());
    }
}

#[test]
fn too_few_values_for_the_class_count_is_an_error() {
    // 8 distinct values cap max_k at 8, and 8 values are not more than that
    let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
    let err = optimizer().call(&data).expect_err("len <= max_k must fail");
    assert!(matches!(err, AnalysisError::InvalidInput(_)));
}

#[test]
fn large_inputs_are_stratified_sampled_deterministically() {
    let mut state = 3_u64;
    let data: Vec<f64> = (0..30_000)
        .map(|i| gaussian(&mut state, (i % 3) as f64 * 20.0, 1.5))
        .collect();
    let opt = optimizer();

    let report = opt
        .analyze_report(&data)
        .expect("large input should classify")
        .value
        .expect("continuous data yields a report");
    assert!(report.sampled);
    assert!(report.n_used <= 10_000 + 100);
    assert!(report.n_used >= 9_900);
    assert_eq!(report.scores.len(), 9);

    let again = opt
        .analyze_report(&data)
        .expect("large input should classify")
        .value
        .expect("continuous data yields a report");
    assert_eq!(report, again);
}
