// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::rng::StableRng;
use crate::stats;
use crate::AnalysisError;

const DEFAULT_MAX_ITER: usize = 300;
const DEFAULT_N_INIT: usize = 10;
const DEFAULT_TOL: f64 = 1.0e-4;

/// Configuration for [`kmeans_1d`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct KMeansConfig {
    pub k: usize,
    pub max_iter: usize,
    pub n_init: usize,
    /// Convergence tolerance relative to the data variance.
    pub tol: f64,
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 2,
            max_iter: DEFAULT_MAX_ITER,
            n_init: DEFAULT_N_INIT,
            tol: DEFAULT_TOL,
            seed: 0,
        }
    }
}

impl KMeansConfig {
    fn validate(&self) -> Result<(), AnalysisError> {
        if self.k == 0 {
            return Err(AnalysisError::invalid_input("KMeansConfig.k must be >= 1; got 0"));
        }
        if self.max_iter == 0 {
            return Err(AnalysisError::invalid_input(
                "KMeansConfig.max_iter must be >= 1; got 0",
            ));
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(AnalysisError::invalid_input(format!(
                "KMeansConfig.tol must be finite and >= 0.0; got {}",
                self.tol
            )));
        }
        Ok(())
    }
}

/// Result of a 1-D k-means fit.
#[derive(Clone, Debug, PartialEq)]
pub struct KMeansFit {
    pub centers: Vec<f64>,
    /// Cluster index per input value.
    pub labels: Vec<usize>,
    /// Within-cluster sum of squared distances.
    pub inertia: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl KMeansFit {
    /// Index of the cluster with the largest center; ties go to the lower index.
    pub fn largest_center(&self) -> usize {
        let mut best = 0;
        for (idx, &center) in self.centers.iter().enumerate().skip(1) {
            if center > self.centers[best] {
                best = idx;
            }
        }
        best
    }
}

/// Seeded k-means++ / Lloyd clustering of scalar values.
///
/// Runs `n_init` restarts from independent seeded streams and keeps the fit
/// with the lowest inertia (earliest restart wins ties). Fewer samples than
/// clusters is a fit failure.
pub fn kmeans_1d(values: &[f64], config: &KMeansConfig) -> Result<KMeansFit, AnalysisError> {
    config.validate()?;

    if let Some((idx, value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(AnalysisError::invalid_input(format!(
            "k-means input must be finite: index {idx} has {value}"
        )));
    }
    if values.len() < config.k {
        return Err(AnalysisError::numerical_issue(format!(
            "k-means with k={} requires at least {} samples; got {}",
            config.k,
            config.k,
            values.len()
        )));
    }

    let variance = stats::population_std(values).map_or(0.0, |std| std * std);
    let shift_tol = config.tol * variance;

    let mut best: Option<KMeansFit> = None;
    for restart in 0..config.n_init.max(1) {
        let mut rng = StableRng::derive(config.seed, restart as u64);
        let seeds = plus_plus_seeds(values, config.k, &mut rng)?;
        let fit = lloyd(values, seeds, config.max_iter, shift_tol);
        let better = best
            .as_ref()
            .is_none_or(|current| fit.inertia < current.inertia);
        if better {
            best = Some(fit);
        }
    }

    let fit = best.ok_or_else(|| AnalysisError::numerical_issue("k-means produced no fit"))?;
    if !fit.converged {
        tracing::debug!(
            iterations = fit.iterations,
            "k-means stopped at max_iter before converging"
        );
    }
    Ok(fit)
}

fn nearest_center(value: f64, centers: &[f64]) -> (usize, f64) {
    let mut best_idx = 0;
    let mut best_dist = f64::INFINITY;
    for (idx, center) in centers.iter().enumerate() {
        let dist = (value - center) * (value - center);
        if dist < best_dist {
            best_dist = dist;
            best_idx = idx;
        }
    }
    (best_idx, best_dist)
}

fn plus_plus_seeds(
    values: &[f64],
    k: usize,
    rng: &mut StableRng,
) -> Result<Vec<f64>, AnalysisError> {
    let mut centers = Vec::with_capacity(k);
    centers.push(values[rng.gen_range(values.len())?]);

    let mut distances: Vec<f64> = values
        .iter()
        .map(|&v| (v - centers[0]) * (v - centers[0]))
        .collect();

    while centers.len() < k {
        let total: f64 = distances.iter().sum();
        let pick = if total > 0.0 {
            let mut target = rng.next_f64() * total;
            let mut chosen = values.len() - 1;
            for (idx, &dist) in distances.iter().enumerate() {
                target -= dist;
                if target < 0.0 {
                    chosen = idx;
                    break;
                }
            }
            chosen
        } else {
            rng.gen_range(values.len())?
        };

        let center = values[pick];
        centers.push(center);
        for (dist, &v) in distances.iter_mut().zip(values) {
            *dist = dist.min((v - center) * (v - center));
        }
    }

    Ok(centers)
}

fn lloyd(values: &[f64], mut centers: Vec<f64>, max_iter: usize, shift_tol: f64) -> KMeansFit {
    let k = centers.len();
    let mut labels = vec![0usize; values.len()];
    let mut iterations = 0;
    let mut converged = false;

    for iteration in 0..max_iter {
        iterations = iteration + 1;
        for (label, &v) in labels.iter_mut().zip(values) {
            *label = nearest_center(v, &centers).0;
        }

        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for (&label, &v) in labels.iter().zip(values) {
            sums[label] += v;
            counts[label] += 1;
        }

        let mut shift = 0.0;
        for idx in 0..k {
            // empty clusters keep their previous center
            if counts[idx] == 0 {
                continue;
            }
            let updated = sums[idx] / counts[idx] as f64;
            shift += (updated - centers[idx]) * (updated - centers[idx]);
            centers[idx] = updated;
        }

        if shift <= shift_tol {
            converged = true;
            break;
        }
    }

    let mut inertia = 0.0;
    for (label, &v) in labels.iter_mut().zip(values) {
        let (idx, dist) = nearest_center(v, &centers);
        *label = idx;
        inertia += dist;
    }

    KMeansFit {
        centers,
        labels,
        inertia,
        iterations,
        converged,
    }
}
