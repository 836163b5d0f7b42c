// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::mixture::{GaussianComponent, MixtureConfig, fit_gaussian_mixture};
use sigrec_core::{Analysis, AnalysisError, AnalysisTool, Diagnostics, RangeBound, stats};
use std::time::Instant;

const DEFAULT_STD_SCALE: f64 = 3.0;
const DEFAULT_WEIGHT_THRESHOLD: f64 = 0.05;
const DEFAULT_DISCRETE_MAX_DISTINCT: usize = 10;

/// Configuration for [`RangeEstimator`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct RangeConfig {
    pub n_components: usize,
    /// Half-width of each component's interval in standard deviations.
    pub std_scale: f64,
    /// Components lighter than this do not contribute to the envelope.
    pub weight_threshold: f64,
    /// Inputs with at most this many distinct values skip modeling.
    pub discrete_max_distinct: usize,
    pub max_iter: usize,
    pub n_init: usize,
    pub tol: f64,
    pub reg_covar: f64,
    pub seed: u64,
}

impl Default for RangeConfig {
    fn default() -> Self {
        let mixture = MixtureConfig::default();
        Self {
            n_components: mixture.n_components,
            std_scale: DEFAULT_STD_SCALE,
            weight_threshold: DEFAULT_WEIGHT_THRESHOLD,
            discrete_max_distinct: DEFAULT_DISCRETE_MAX_DISTINCT,
            max_iter: mixture.max_iter,
            n_init: mixture.n_init,
            tol: mixture.tol,
            reg_covar: mixture.reg_covar,
            seed: mixture.seed,
        }
    }
}

impl RangeConfig {
    /// Defaults with the caller-facing knobs overridden.
    pub fn with_params(n_components: usize, std_scale: f64, weight_threshold: f64) -> Self {
        Self {
            n_components,
            std_scale,
            weight_threshold,
            ..Self::default()
        }
    }

    fn mixture(&self) -> MixtureConfig {
        MixtureConfig {
            n_components: self.n_components,
            max_iter: self.max_iter,
            n_init: self.n_init,
            tol: self.tol,
            reg_covar: self.reg_covar,
            seed: self.seed,
        }
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        if !self.std_scale.is_finite() || self.std_scale < 0.0 {
            return Err(AnalysisError::invalid_input(format!(
                "RangeConfig.std_scale must be finite and >= 0.0; got {}",
                self.std_scale
            )));
        }
        if !(0.0..=1.0).contains(&self.weight_threshold) {
            return Err(AnalysisError::invalid_input(format!(
                "RangeConfig.weight_threshold must be in [0.0, 1.0]; got {}",
                self.weight_threshold
            )));
        }
        self.mixture().validate()
    }
}

/// Estimates the typical operating range of a 1-D variable.
///
/// A Gaussian mixture is fitted, light components are dropped, and the data
/// is trimmed to the `mean ± std_scale * std` envelope of the survivors. The
/// bound is the extent of what remains.
#[derive(Clone, Debug)]
pub struct RangeEstimator {
    config: RangeConfig,
}

impl RangeEstimator {
    pub fn new(config: RangeConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_params(
        n_components: usize,
        std_scale: f64,
        weight_threshold: f64,
    ) -> Result<Self, AnalysisError> {
        Self::new(RangeConfig::with_params(
            n_components,
            std_scale,
            weight_threshold,
        ))
    }

    pub fn config(&self) -> &RangeConfig {
        &self.config
    }

    fn envelope(&self, components: &[GaussianComponent]) -> Option<(f64, f64)> {
        components
            .iter()
            .filter(|component| component.weight >= self.config.weight_threshold)
            .map(|component| {
                let half = self.config.std_scale * component.std();
                (component.mean - half, component.mean + half)
            })
            .reduce(|(lo, hi), (c_lo, c_hi)| (lo.min(c_lo), hi.max(c_hi)))
    }
}

impl AnalysisTool for RangeEstimator {
    type Input = [f64];
    type Output = RangeBound;

    fn name(&self) -> &'static str {
        "range_estimator"
    }

    fn analyze(&self, data: &[f64]) -> Result<Analysis<RangeBound>, AnalysisError> {
        let started_at = Instant::now();
        let mut diagnostics = Diagnostics::for_algorithm(self.name());
        diagnostics.d = 1;
        diagnostics.seed = Some(self.config.seed);
        #[cfg(feature = "serde")]
        {
            diagnostics.params_json = serde_json::to_value(&self.config).ok();
        }

        let (finite, dropped) = stats::finite_values(data);
        diagnostics.n = finite.len();
        if dropped > 0 {
            diagnostics.note(format!("dropped {dropped} non-finite values"));
        }
        let Some((data_min, data_max)) = stats::min_max(&finite) else {
            return Err(AnalysisError::invalid_input(
                "range estimation requires at least one finite value",
            ));
        };
        let full = RangeBound {
            lower: data_min,
            upper: data_max,
        };

        let distinct = stats::distinct_count(&finite);
        if distinct <= self.config.discrete_max_distinct {
            diagnostics.note(format!(
                "{distinct} distinct values (<= {}); returning the data range",
                self.config.discrete_max_distinct
            ));
            diagnostics.finish(started_at);
            return Ok(Analysis::new(full, diagnostics));
        }

        let fit = fit_gaussian_mixture(&finite, &self.config.mixture())?;
        if !fit.converged {
            diagnostics.warn(format!(
                "mixture fit did not converge within max_iter={}",
                self.config.max_iter
            ));
        }
        for component in &fit.components {
            tracing::debug!(
                weight = component.weight,
                mean = component.mean,
                std = component.std(),
                "mixture component"
            );
        }

        let (lower, upper) = match self.envelope(&fit.components) {
            Some(envelope) => envelope,
            None => {
                diagnostics.warn(format!(
                    "no component reaches weight_threshold={}; using the data range",
                    self.config.weight_threshold
                ));
                (data_min, data_max)
            }
        };

        let trimmed: Vec<f64> = finite
            .iter()
            .copied()
            .filter(|&v| v >= lower && v <= upper)
            .collect();
        let bound = match stats::min_max(&trimmed) {
            Some((lo, hi)) => RangeBound {
                lower: lo,
                upper: hi,
            },
            None => {
                diagnostics.warn("envelope excludes every value; using the data range");
                full
            }
        };

        diagnostics.note(format!(
            "components={}, envelope=[{lower}, {upper}], kept={} of {}, iterations={}",
            fit.components.len(),
            trimmed.len(),
            finite.len(),
            fit.iterations
        ));
        tracing::debug!(
            lower = bound.lower,
            upper = bound.upper,
            kept = trimmed.len(),
            "range estimated"
        );
        diagnostics.finish(started_at);
        Ok(Analysis::new(bound, diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::{RangeConfig, RangeEstimator};
    use crate::mixture::GaussianComponent;
    use sigrec_core::{AnalysisError, AnalysisTool};

    fn estimator() -> RangeEstimator {
        RangeEstimator::new(RangeConfig::default()).expect("default config should be valid")
    }

    #[test]
    fn config_defaults_and_validation() {
        let cfg = RangeConfig::default();
        assert_eq!(cfg.n_components, 3);
        assert_eq!(cfg.std_scale, 3.0);
        assert_eq!(cfg.weight_threshold, 0.05);
        assert_eq!(cfg.discrete_max_distinct, 10);
        assert_eq!(cfg.max_iter, 100);
        assert_eq!(cfg.n_init, 5);
        assert!(RangeEstimator::with_params(3, -1.0, 0.05).is_err());
        assert!(RangeEstimator::with_params(3, 3.0, 1.5).is_err());
        assert!(RangeEstimator::with_params(0, 3.0, 0.05).is_err());
    }

    #[test]
    fn envelope_skips_light_components() {
        let est = estimator();
        let components = [
            GaussianComponent {
                weight: 0.6,
                mean: 10.0,
                variance: 1.0,
            },
            GaussianComponent {
                weight: 0.38,
                mean: 20.0,
                variance: 4.0,
            },
            GaussianComponent {
                weight: 0.02,
                mean: 500.0,
                variance: 1.0,
            },
        ];
        assert_eq!(est.envelope(&components), Some((7.0, 26.0)));
        assert_eq!(est.envelope(&components[2..]), None);
    }

    #[test]
    fn discrete_data_returns_exact_extent() {
        let data = [4.0, 2.0, 9.0, 2.0, 4.0, 7.0, 9.0, 1.0];
        let analysis = estimator().analyze(&data).expect("discrete data must not fail");
        assert_eq!(analysis.value.as_array(), [1.0, 9.0]);
        assert!(analysis.diagnostics.warnings.is_empty());
    }

    #[test]
    fn empty_or_non_finite_input_is_invalid() {
        let err = estimator().call(&[]).expect_err("empty input must fail");
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
        assert!(estimator().call(&[f64::NAN, f64::NEG_INFINITY]).is_err());
    }

    #[test]
    fn non_finite_values_are_dropped() {
        let data = [f64::NAN, 3.0, 1.0, f64::INFINITY, 2.0];
        let analysis = estimator().analyze(&data).expect("finite remainder should work");
        assert_eq!(analysis.value.as_array(), [1.0, 3.0]);
        assert_eq!(analysis.diagnostics.n, 3);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_deserializes_partial_json_with_defaults() {
        let cfg: RangeConfig = serde_json::from_str(r#"{"n_components": 2, "std_scale": 2.0}"#)
            .expect("partial config should deserialize");
        assert_eq!(cfg.n_components, 2);
        assert_eq!(cfg.std_scale, 2.0);
        assert_eq!(cfg.weight_threshold, 0.05);
        assert_eq!(cfg.reg_covar, 1.0e-6);
    }
}
