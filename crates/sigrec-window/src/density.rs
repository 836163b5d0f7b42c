// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use sigrec_core::{Analysis, AnalysisError, AnalysisTool, Diagnostics, KMeansConfig, kmeans_1d};

const DEFAULT_FLOOR: f64 = 0.001;
const DEFAULT_MAX_ITER: usize = 300;
const DEFAULT_N_INIT: usize = 10;

/// Configuration for [`DensityClassifier`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct DensityConfig {
    /// Entropy must exceed this to take part in clustering.
    pub floor: f64,
    pub seed: u64,
    pub max_iter: usize,
    pub n_init: usize,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            floor: DEFAULT_FLOOR,
            seed: 0,
            max_iter: DEFAULT_MAX_ITER,
            n_init: DEFAULT_N_INIT,
        }
    }
}

impl DensityConfig {
    fn validate(&self) -> Result<(), AnalysisError> {
        if !self.floor.is_finite() || self.floor < 0.0 {
            return Err(AnalysisError::invalid_input(format!(
                "DensityConfig.floor must be finite and >= 0.0; got {}",
                self.floor
            )));
        }
        if self.max_iter == 0 {
            return Err(AnalysisError::invalid_input(
                "DensityConfig.max_iter must be >= 1; got 0",
            ));
        }
        if self.n_init == 0 {
            return Err(AnalysisError::invalid_input(
                "DensityConfig.n_init must be >= 1; got 0",
            ));
        }
        Ok(())
    }
}

/// Labels an entropy profile as high (1) or low (0) information.
#[derive(Clone, Debug)]
pub struct DensityClassifier {
    config: DensityConfig,
}

impl DensityClassifier {
    pub fn new(config: DensityConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DensityConfig {
        &self.config
    }

    fn is_valid(&self, entropy: f64) -> bool {
        entropy > self.config.floor
    }
}

impl AnalysisTool for DensityClassifier {
    type Input = [f64];
    type Output = Vec<u8>;

    fn name(&self) -> &'static str {
        "density_classifier"
    }

    fn analyze(&self, entropy: &[f64]) -> Result<Analysis<Vec<u8>>, AnalysisError> {
        let mut diagnostics = Diagnostics::for_algorithm(self.name());
        diagnostics.n = entropy.len();
        diagnostics.d = 1;
        diagnostics.seed = Some(self.config.seed);

        let valid: Vec<f64> = entropy
            .iter()
            .copied()
            .filter(|&h| self.is_valid(h))
            .collect();
        if valid.is_empty() {
            diagnostics.warn(format!(
                "no entropy value exceeds floor={}; every timestep labeled low-information",
                self.config.floor
            ));
            return Ok(Analysis::new(vec![0; entropy.len()], diagnostics));
        }

        let fit = kmeans_1d(
            &valid,
            &KMeansConfig {
                k: 2,
                max_iter: self.config.max_iter,
                n_init: self.config.n_init,
                seed: self.config.seed,
                ..KMeansConfig::default()
            },
        )?;
        let high = fit.largest_center();

        let mut cluster_labels = fit.labels.iter();
        let mut labels = Vec::with_capacity(entropy.len());
        for &h in entropy {
            let label = if self.is_valid(h) {
                // valid entries consume cluster labels in the order they were collected
                cluster_labels.next().is_some_and(|&cluster| cluster == high)
            } else {
                false
            };
            labels.push(u8::from(label));
        }

        let high_count = labels.iter().filter(|&&l| l == 1).count();
        diagnostics.note(format!(
            "valid={}, high={high_count}, centers={:?}, high_center={}, iterations={}",
            valid.len(),
            fit.centers,
            fit.centers[high],
            fit.iterations
        ));
        if !fit.converged {
            diagnostics.warn(format!(
                "2-cluster fit stopped at max_iter={} before converging",
                self.config.max_iter
            ));
        }
        Ok(Analysis::new(labels, diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::{DensityClassifier, DensityConfig};
    use sigrec_core::{AnalysisError, AnalysisTool};

    fn classifier() -> DensityClassifier {
        DensityClassifier::new(DensityConfig::default()).expect("default config should be valid")
    }

    #[test]
    fn config_defaults_and_validation() {
        let cfg = DensityConfig::default();
        assert_eq!(cfg.floor, 0.001);
        assert_eq!(cfg.max_iter, 300);
        assert!(
            DensityClassifier::new(DensityConfig {
                floor: f64::NAN,
                ..DensityConfig::default()
            })
            .is_err()
        );
        assert!(
            DensityClassifier::new(DensityConfig {
                n_init: 0,
                ..DensityConfig::default()
            })
            .is_err()
        );
    }

    #[test]
    fn all_sub_floor_profile_is_low_with_warning() {
        let analysis = classifier()
            .analyze(&[0.0, 0.0005, 0.001, 0.0])
            .expect("degenerate profile must not fail");
        assert_eq!(analysis.value, vec![0, 0, 0, 0]);
        assert_eq!(analysis.diagnostics.warnings.len(), 1);
    }

    #[test]
    fn larger_center_is_high_and_sub_floor_is_low() {
        let entropy = [0.0, 0.2, 0.25, 3.0, 3.1, 0.0, 2.9, 0.3];
        let labels = classifier().call(&entropy).expect("classification should succeed");
        assert_eq!(labels, vec![0, 0, 0, 1, 1, 0, 1, 0]);
    }

    #[test]
    fn single_valid_value_is_a_fit_failure() {
        let err = classifier()
            .call(&[0.0, 1.5, 0.0])
            .expect_err("one sample cannot fit two clusters");
        assert!(matches!(err, AnalysisError::NumericalIssue(_)));
    }

    #[test]
    fn nan_entries_are_low() {
        let labels = classifier()
            .call(&[f64::NAN, 0.1, 0.1, 4.0, 4.0])
            .expect("classification should succeed");
        assert_eq!(labels, vec![0, 0, 0, 1, 1]);
    }
}
