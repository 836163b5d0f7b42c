// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use sigrec_core::{AnalysisError, StableRng, stats};

/// Rows per stratum used to size the stratification.
const ROWS_PER_STRATUM: usize = 100;

/// Equal-width stratified subsample of `values`, capped near `cap` points.
///
/// Inputs of at most `cap` points are returned unchanged. Otherwise the
/// value range is cut into `min(max_strata, n / 100)` equal-width strata and
/// every populated stratum keeps `clamp(round(len / n * cap), 1, len)` points
/// drawn without replacement. Output order is stratum by stratum, in draw order.
pub fn stratified_sample(
    values: &[f64],
    cap: usize,
    max_strata: usize,
    seed: u64,
) -> Result<Vec<f64>, AnalysisError> {
    let n = values.len();
    if n <= cap {
        return Ok(values.to_vec());
    }
    let (lo, hi) = stats::min_max(values).ok_or_else(|| {
        AnalysisError::invalid_input("stratified sampling requires at least one finite value")
    })?;

    let strata = max_strata.min(n / ROWS_PER_STRATUM).max(1);
    let width = (hi - lo) / strata as f64;

    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); strata];
    for &v in values {
        let idx = if width > 0.0 {
            (((v - lo) / width) as usize).min(strata - 1)
        } else {
            0
        };
        buckets[idx].push(v);
    }

    let mut rng = StableRng::new(seed);
    let mut sample = Vec::with_capacity(cap + strata);
    for bucket in buckets.iter().filter(|bucket| !bucket.is_empty()) {
        let share = (bucket.len() as f64 / n as f64 * cap as f64).round() as usize;
        let take = share.clamp(1, bucket.len());
        for idx in rng.sample_indices(bucket.len(), take)? {
            sample.push(bucket[idx]);
        }
    }

    tracing::debug!(
        n,
        cap,
        strata,
        kept = sample.len(),
        "stratified sample drawn"
    );
    Ok(sample)
}

#[cfg(test)]
mod tests {
    use super::stratified_sample;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| (i * 37 % n) as f64).collect()
    }

    #[test]
    fn small_inputs_pass_through() {
        let values = ramp(500);
        assert_eq!(
            stratified_sample(&values, 1_000, 100, 0).expect("sampling should succeed"),
            values
        );
    }

    #[test]
    fn uniform_input_is_sampled_to_the_cap() {
        let values = ramp(20_000);
        let sample = stratified_sample(&values, 10_000, 100, 3).expect("sampling should succeed");
        assert_eq!(sample.len(), 10_000);
        assert!(sample.iter().all(|v| (0.0..20_000.0).contains(v)));
        // the ramp has no duplicates, so drawing without replacement keeps every value distinct
        let mut sorted = sample.clone();
        sorted.sort_by(f64::total_cmp);
        sorted.dedup();
        assert_eq!(sorted.len(), sample.len());
    }

    #[test]
    fn sparse_strata_keep_at_least_one_point() {
        let mut values = vec![0.0; 20_000];
        for (i, v) in values.iter_mut().enumerate() {
            *v = (i % 50) as f64 * 0.01;
        }
        values[0] = 1_000.0;
        let sample = stratified_sample(&values, 5_000, 100, 11).expect("sampling should succeed");
        assert!(sample.contains(&1_000.0));
        assert!(sample.len() <= 5_000 + 100);
    }

    #[test]
    fn same_seed_same_sample() {
        let values = ramp(15_000);
        let a = stratified_sample(&values, 10_000, 100, 42).expect("sampling should succeed");
        let b = stratified_sample(&values, 10_000, 100, 42).expect("sampling should succeed");
        assert_eq!(a, b);
    }
}
