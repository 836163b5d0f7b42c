// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use sigrec_core::{AnalysisError, KMeansConfig, StableRng, kmeans_1d};

const DEFAULT_N_COMPONENTS: usize = 3;
const DEFAULT_MAX_ITER: usize = 100;
const DEFAULT_N_INIT: usize = 5;
const DEFAULT_TOL: f64 = 1.0e-3;
const DEFAULT_REG_COVAR: f64 = 1.0e-6;
const LN_2PI: f64 = 1.837_877_066_409_345_5;
/// Added to every responsibility sum so empty components keep finite parameters.
const RESP_FLOOR: f64 = 10.0 * f64::EPSILON;

/// Configuration for [`fit_gaussian_mixture`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct MixtureConfig {
    pub n_components: usize,
    pub max_iter: usize,
    pub n_init: usize,
    /// Stop once the per-sample log-likelihood changes by less than this.
    pub tol: f64,
    /// Added to every variance.
    pub reg_covar: f64,
    pub seed: u64,
}

impl Default for MixtureConfig {
    fn default() -> Self {
        Self {
            n_components: DEFAULT_N_COMPONENTS,
            max_iter: DEFAULT_MAX_ITER,
            n_init: DEFAULT_N_INIT,
            tol: DEFAULT_TOL,
            reg_covar: DEFAULT_REG_COVAR,
            seed: 0,
        }
    }
}

impl MixtureConfig {
    pub(crate) fn validate(&self) -> Result<(), AnalysisError> {
        if self.n_components == 0 {
            return Err(AnalysisError::invalid_input(
                "MixtureConfig.n_components must be >= 1; got 0",
            ));
        }
        if self.max_iter == 0 {
            return Err(AnalysisError::invalid_input(
                "MixtureConfig.max_iter must be >= 1; got 0",
            ));
        }
        if self.n_init == 0 {
            return Err(AnalysisError::invalid_input(
                "MixtureConfig.n_init must be >= 1; got 0",
            ));
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(AnalysisError::invalid_input(format!(
                "MixtureConfig.tol must be finite and >= 0.0; got {}",
                self.tol
            )));
        }
        if !self.reg_covar.is_finite() || self.reg_covar < 0.0 {
            return Err(AnalysisError::invalid_input(format!(
                "MixtureConfig.reg_covar must be finite and >= 0.0; got {}",
                self.reg_covar
            )));
        }
        Ok(())
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaussianComponent {
    pub weight: f64,
    pub mean: f64,
    pub variance: f64,
}

impl GaussianComponent {
    pub fn std(&self) -> f64 {
        self.variance.sqrt()
    }

    fn log_density(&self, x: f64) -> f64 {
        let diff = x - self.mean;
        -0.5 * (LN_2PI + self.variance.ln() + diff * diff / self.variance)
    }
}

/// A fitted 1-D Gaussian mixture.
#[derive(Clone, Debug, PartialEq)]
pub struct MixtureFit {
    pub components: Vec<GaussianComponent>,
    /// Mean per-sample log-likelihood at the last iteration.
    pub lower_bound: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Fits a Gaussian mixture to finite scalar values with expectation-maximization.
///
/// Each of the `n_init` restarts is initialized from a seeded k-means
/// labelling. The restart with the highest final lower bound is kept.
pub fn fit_gaussian_mixture(
    values: &[f64],
    config: &MixtureConfig,
) -> Result<MixtureFit, AnalysisError> {
    config.validate()?;
    if let Some((idx, value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(AnalysisError::invalid_input(format!(
            "mixture input must be finite: index {idx} has {value}"
        )));
    }
    if values.len() < config.n_components {
        return Err(AnalysisError::numerical_issue(format!(
            "mixture with {} components requires at least {} samples; got {}",
            config.n_components,
            config.n_components,
            values.len()
        )));
    }

    let mut best: Option<MixtureFit> = None;
    for init in 0..config.n_init {
        let init_seed = StableRng::derive(config.seed, init as u64).next_u64();
        let fit = run_em(values, config, init_seed)?;
        tracing::trace!(
            init,
            lower_bound = fit.lower_bound,
            iterations = fit.iterations,
            "mixture restart finished"
        );
        if best
            .as_ref()
            .is_none_or(|current| fit.lower_bound > current.lower_bound)
        {
            best = Some(fit);
        }
    }

    best.ok_or_else(|| AnalysisError::numerical_issue("mixture fit produced no result"))
}

fn run_em(values: &[f64], config: &MixtureConfig, seed: u64) -> Result<MixtureFit, AnalysisError> {
    let k = config.n_components;
    let n = values.len();

    let labels = kmeans_1d(
        values,
        &KMeansConfig {
            k,
            n_init: 1,
            seed,
            ..KMeansConfig::default()
        },
    )?
    .labels;
    let mut resp = vec![0.0; n * k];
    for (row, &label) in labels.iter().enumerate() {
        resp[row * k + label] = 1.0;
    }
    let mut components = maximization(values, &resp, k, config.reg_covar);

    let mut lower_bound = f64::NEG_INFINITY;
    let mut iterations = 0;
    let mut converged = false;
    for iteration in 1..=config.max_iter {
        iterations = iteration;
        let previous = lower_bound;
        lower_bound = expectation(values, &components, &mut resp);
        if !lower_bound.is_finite() {
            return Err(AnalysisError::numerical_issue(format!(
                "mixture log-likelihood became non-finite at iteration {iteration}"
            )));
        }
        components = maximization(values, &resp, k, config.reg_covar);

        if (lower_bound - previous).abs() < config.tol {
            converged = true;
            break;
        }
    }

    Ok(MixtureFit {
        components,
        lower_bound,
        iterations,
        converged,
    })
}

/// Fills `resp` with posterior responsibilities and returns the mean log-likelihood.
fn expectation(values: &[f64], components: &[GaussianComponent], resp: &mut [f64]) -> f64 {
    let k = components.len();
    let mut total = 0.0;
    for (row, &x) in values.iter().enumerate() {
        let weighted = &mut resp[row * k..(row + 1) * k];
        let mut peak = f64::NEG_INFINITY;
        for (slot, component) in weighted.iter_mut().zip(components) {
            *slot = component.weight.ln() + component.log_density(x);
            peak = peak.max(*slot);
        }
        let norm = peak + weighted.iter().map(|w| (w - peak).exp()).sum::<f64>().ln();
        for slot in weighted.iter_mut() {
            *slot = (*slot - norm).exp();
        }
        total += norm;
    }
    total / values.len() as f64
}

fn maximization(values: &[f64], resp: &[f64], k: usize, reg_covar: f64) -> Vec<GaussianComponent> {
    let n = values.len();
    let mut totals = vec![RESP_FLOOR; k];
    let mut sums = vec![0.0; k];
    for (row, &x) in values.iter().enumerate() {
        for comp in 0..k {
            let r = resp[row * k + comp];
            totals[comp] += r;
            sums[comp] += r * x;
        }
    }
    let means: Vec<f64> = sums.iter().zip(&totals).map(|(s, t)| s / t).collect();

    let mut spreads = vec![0.0; k];
    for (row, &x) in values.iter().enumerate() {
        for comp in 0..k {
            let diff = x - means[comp];
            spreads[comp] += resp[row * k + comp] * diff * diff;
        }
    }

    (0..k)
        .map(|comp| GaussianComponent {
            weight: totals[comp] / n as f64,
            mean: means[comp],
            variance: spreads[comp] / totals[comp] + reg_covar,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{MixtureConfig, fit_gaussian_mixture};
    use sigrec_core::AnalysisError;

    fn two_blobs() -> Vec<f64> {
        let mut values = Vec::new();
        for i in 0..200 {
            let jitter = ((i * 37) % 101) as f64 / 100.0 - 0.5;
            values.push(if i % 4 == 0 { 50.0 + jitter } else { jitter });
        }
        values
    }

    #[test]
    fn recovers_two_well_separated_components() {
        let fit = fit_gaussian_mixture(
            &two_blobs(),
            &MixtureConfig {
                n_components: 2,
                ..MixtureConfig::default()
            },
        )
        .expect("fit should succeed");
        let mut comps = fit.components.clone();
        comps.sort_by(|a, b| a.mean.total_cmp(&b.mean));
        assert!(comps[0].mean.abs() < 0.2);
        assert!((comps[1].mean - 50.0).abs() < 0.2);
        assert!((comps[0].weight - 0.75).abs() < 1.0e-3);
        assert!((comps[1].weight - 0.25).abs() < 1.0e-3);
        assert!(fit.converged);
        assert!(fit.lower_bound.is_finite());
    }

    #[test]
    fn weights_sum_to_one_and_variances_are_regularized() {
        let fit = fit_gaussian_mixture(&two_blobs(), &MixtureConfig::default())
            .expect("fit should succeed");
        let total: f64 = fit.components.iter().map(|c| c.weight).sum();
        assert!((total - 1.0).abs() < 1.0e-9);
        assert!(fit.components.iter().all(|c| c.variance >= 1.0e-6));
    }

    #[test]
    fn deterministic_for_a_fixed_seed() {
        let cfg = MixtureConfig {
            seed: 9,
            ..MixtureConfig::default()
        };
        let a = fit_gaussian_mixture(&two_blobs(), &cfg).expect("fit a");
        let b = fit_gaussian_mixture(&two_blobs(), &cfg).expect("fit b");
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_config_and_input() {
        assert!(
            fit_gaussian_mixture(
                &two_blobs(),
                &MixtureConfig {
                    n_init: 0,
                    ..MixtureConfig::default()
                }
            )
            .is_err()
        );
        let err = fit_gaussian_mixture(&[1.0, 2.0], &MixtureConfig::default())
            .expect_err("two samples cannot fit three components");
        assert!(matches!(err, AnalysisError::NumericalIssue(_)));
        assert!(
            fit_gaussian_mixture(&[1.0, f64::NAN, 2.0, 3.0], &MixtureConfig::default()).is_err()
        );
    }
}
