// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::density::{DensityClassifier, DensityConfig};
use crate::entropy::{EntropyConfig, EntropyProfiler};
use crate::segment::{SegmentConfig, SegmentExtractor, SegmentInputs};
use sigrec_core::{
    AlignmentPolicy, Analysis, AnalysisError, AnalysisTool, ChannelData, Diagnostics,
    MultiChannelSeries, Segment,
};
use std::time::Instant;

/// Configuration for [`TrainingWindowSelector`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainingWindowConfig {
    pub entropy: EntropyConfig,
    pub density: DensityConfig,
    pub segment: SegmentConfig,
    pub alignment: AlignmentPolicy,
}

impl TrainingWindowConfig {
    /// Defaults with the four caller-facing knobs overridden.
    pub fn with_params(win: usize, k_start: usize, k_stop: usize, nan_thr: f64) -> Self {
        Self {
            entropy: EntropyConfig {
                window: win,
                ..EntropyConfig::default()
            },
            segment: SegmentConfig {
                k_start,
                k_stop,
                nan_thr,
            },
            ..Self::default()
        }
    }
}

/// Recommends time windows with sustained high information density.
///
/// Composes [`EntropyProfiler`], [`DensityClassifier`] and [`SegmentExtractor`].
/// All channels are read on the first channel's timestamp axis.
#[derive(Clone, Debug)]
pub struct TrainingWindowSelector {
    config: TrainingWindowConfig,
    profiler: EntropyProfiler,
    classifier: DensityClassifier,
    extractor: SegmentExtractor,
}

impl TrainingWindowSelector {
    pub fn new(config: TrainingWindowConfig) -> Result<Self, AnalysisError> {
        let profiler = EntropyProfiler::new(config.entropy.clone())?;
        let classifier = DensityClassifier::new(config.density.clone())?;
        let extractor = SegmentExtractor::new(config.segment.clone())?;
        Ok(Self {
            config,
            profiler,
            classifier,
            extractor,
        })
    }

    pub fn with_params(
        win: usize,
        k_start: usize,
        k_stop: usize,
        nan_thr: f64,
    ) -> Result<Self, AnalysisError> {
        Self::new(TrainingWindowConfig::with_params(win, k_start, k_stop, nan_thr))
    }

    pub fn config(&self) -> &TrainingWindowConfig {
        &self.config
    }

    /// Runs the pipeline on an already aligned series.
    pub fn select(
        &self,
        series: &MultiChannelSeries,
    ) -> Result<Analysis<Vec<Segment>>, AnalysisError> {
        let started_at = Instant::now();
        let mut diagnostics = Diagnostics::for_algorithm(self.name());
        diagnostics.n = series.n();
        diagnostics.d = series.d();
        diagnostics.seed = Some(self.config.density.seed);
        #[cfg(feature = "serde")]
        {
            diagnostics.params_json = serde_json_value(&self.config);
        }

        let profile = self.profiler.analyze(series)?;
        let labels = self.classifier.analyze(&profile.value.combined)?;
        let missing_fraction = series.missing_fraction();
        let segments = self.extractor.extract(&SegmentInputs {
            timestamps: series.timestamps(),
            entropy: &profile.value.combined,
            labels: &labels.value,
            missing_fraction: &missing_fraction,
        })?;

        diagnostics.absorb(profile.diagnostics);
        diagnostics.absorb(labels.diagnostics);
        diagnostics.absorb(segments.diagnostics);

        let segments = segments.value;
        tracing::info!(
            segments = segments.len(),
            n = series.n(),
            channels = series.d(),
            "training window detection finished"
        );
        diagnostics.note(format!("detected_segments={}", segments.len()));
        diagnostics.finish(started_at);
        Ok(Analysis::new(segments, diagnostics))
    }
}

impl AnalysisTool for TrainingWindowSelector {
    type Input = [ChannelData];
    type Output = Vec<Segment>;

    fn name(&self) -> &'static str {
        "training_windows"
    }

    fn analyze(&self, channels: &[ChannelData]) -> Result<Analysis<Vec<Segment>>, AnalysisError> {
        if channels.is_empty() {
            return Err(AnalysisError::invalid_input(
                "training window selection requires at least one channel",
            ));
        }
        let series = MultiChannelSeries::align(channels.to_vec(), self.config.alignment)?;
        self.select(&series)
    }
}

#[cfg(feature = "serde")]
fn serde_json_value<T: serde::Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

#[cfg(test)]
mod tests {
    use super::{TrainingWindowConfig, TrainingWindowSelector};
    use sigrec_core::{AnalysisError, AnalysisTool, ChannelData};

    #[test]
    fn with_params_overrides_caller_knobs_only() {
        let cfg = TrainingWindowConfig::with_params(50, 2, 4, 0.1);
        assert_eq!(cfg.entropy.window, 50);
        assert_eq!(cfg.entropy.bins, 10);
        assert_eq!(cfg.segment.k_start, 2);
        assert_eq!(cfg.segment.k_stop, 4);
        assert_eq!(cfg.segment.nan_thr, 0.1);
        assert_eq!(cfg.density.floor, 0.001);
    }

    #[test]
    fn default_config_matches_documented_defaults() {
        let cfg = TrainingWindowConfig::default();
        assert_eq!(cfg.entropy.window, 300);
        assert_eq!(cfg.segment.k_start, 3);
        assert_eq!(cfg.segment.k_stop, 3);
        assert_eq!(cfg.segment.nan_thr, 0.05);
    }

    #[test]
    fn invalid_sub_config_is_rejected() {
        assert!(TrainingWindowSelector::with_params(0, 3, 3, 0.05).is_err());
        assert!(TrainingWindowSelector::with_params(10, 0, 3, 0.05).is_err());
    }

    #[test]
    fn no_channels_is_invalid_input() {
        let selector =
            TrainingWindowSelector::with_params(10, 3, 3, 0.05).expect("config should be valid");
        let err = selector.call(&[]).expect_err("empty input must fail");
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }

    #[test]
    fn flat_channels_yield_no_segments_and_warnings() {
        let selector =
            TrainingWindowSelector::with_params(10, 3, 3, 0.05).expect("config should be valid");
        let timestamps: Vec<f64> = (0..100).map(|t| t as f64).collect();
        let analysis = selector
            .analyze(&[ChannelData::new("flat", timestamps, vec![1.0; 100])])
            .expect("flat input must not fail");
        assert!(analysis.value.is_empty());
        assert!(!analysis.diagnostics.warnings.is_empty());
        assert!(
            analysis
                .diagnostics
                .notes
                .iter()
                .any(|note| note == "detected_segments=0")
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_deserializes_nested_partial_json_with_defaults() {
        let cfg: TrainingWindowConfig = serde_json::from_str(
            r#"{"entropy": {"window": 40}, "segment": {"k_start": 5}, "alignment": "strict"}"#,
        )
        .expect("partial config should deserialize");
        assert_eq!(cfg.entropy.window, 40);
        assert_eq!(cfg.entropy.bins, 10);
        assert_eq!(cfg.segment.k_start, 5);
        assert_eq!(cfg.segment.k_stop, 3);
        assert_eq!(cfg.alignment, sigrec_core::AlignmentPolicy::Strict);
    }
}
