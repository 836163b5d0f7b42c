// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Descriptive statistics shared by the analysis tools.
//!
//! Functions returning `Option` yield `None` on empty input instead of `NaN`.

/// Splits off the finite entries of `data`, returning them with the count dropped.
pub fn finite_values(data: &[f64]) -> (Vec<f64>, usize) {
    let finite: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    let dropped = data.len() - finite.len();
    (finite, dropped)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population (ddof = 0) standard deviation.
pub fn population_std(values: &[f64]) -> Option<f64> {
    let mu = mean(values)?;
    let var = values.iter().map(|v| (v - mu) * (v - mu)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// Sum of squared deviations from the mean.
pub fn sum_squared_deviations(values: &[f64]) -> f64 {
    match mean(values) {
        Some(mu) => values.iter().map(|v| (v - mu) * (v - mu)).sum(),
        None => 0.0,
    }
}

/// Minimum and maximum over the non-NaN entries.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Ascending copy of `values` ordered by `f64::total_cmp`.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

/// Number of distinct non-NaN values; `-0.0` and `0.0` count once.
pub fn distinct_count(values: &[f64]) -> usize {
    let mut unique: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    unique.sort_by(f64::total_cmp);
    unique.dedup_by(|a, b| a == b);
    unique.len()
}
