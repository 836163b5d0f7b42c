// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use sigrec_core::{Analysis, AnalysisError, Diagnostics, Segment, stats};

const DEFAULT_K_START: usize = 3;
const DEFAULT_K_STOP: usize = 3;
const DEFAULT_NAN_THR: f64 = 0.05;
const HIGH_STD_SCALE: f64 = 0.5;
const LOW_STD_SCALE: f64 = 1.5;

/// Configuration for [`SegmentExtractor`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct SegmentConfig {
    /// Consecutive qualifying samples needed to open a segment.
    pub k_start: usize,
    /// Consecutive disqualifying samples needed to close a segment.
    pub k_stop: usize,
    /// Timesteps with a larger missing-channel fraction are skipped.
    pub nan_thr: f64,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            k_start: DEFAULT_K_START,
            k_stop: DEFAULT_K_STOP,
            nan_thr: DEFAULT_NAN_THR,
        }
    }
}

impl SegmentConfig {
    fn validate(&self) -> Result<(), AnalysisError> {
        if self.k_start == 0 {
            return Err(AnalysisError::invalid_input(
                "SegmentConfig.k_start must be >= 1; got 0",
            ));
        }
        if self.k_stop == 0 {
            return Err(AnalysisError::invalid_input(
                "SegmentConfig.k_stop must be >= 1; got 0",
            ));
        }
        if !(0.0..=1.0).contains(&self.nan_thr) {
            return Err(AnalysisError::invalid_input(format!(
                "SegmentConfig.nan_thr must be within [0.0, 1.0]; got {}",
                self.nan_thr
            )));
        }
        Ok(())
    }
}

/// Per-timestep signals consumed by [`SegmentExtractor::extract`].
#[derive(Clone, Copy, Debug)]
pub struct SegmentInputs<'a> {
    pub timestamps: &'a [f64],
    pub entropy: &'a [f64],
    pub labels: &'a [u8],
    /// Fraction of channels missing at each timestep.
    pub missing_fraction: &'a [f64],
}

impl SegmentInputs<'_> {
    fn validate(&self) -> Result<usize, AnalysisError> {
        let n = self.timestamps.len();
        for (name, len) in [
            ("entropy", self.entropy.len()),
            ("labels", self.labels.len()),
            ("missing_fraction", self.missing_fraction.len()),
        ] {
            if len != n {
                return Err(AnalysisError::invalid_input(format!(
                    "SegmentInputs.{name} has length {len}; expected {n} to match timestamps"
                )));
            }
        }
        Ok(n)
    }
}

/// Entry and exit thresholds derived from the high-information pool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    pub high: f64,
    pub low: f64,
}

impl Thresholds {
    /// `mean + 0.5 std` and `mean - 1.5 std` of the entropy values labeled 1.
    ///
    /// Returns `None` when no value is labeled 1.
    pub fn from_high_pool(entropy: &[f64], labels: &[u8]) -> Option<Self> {
        let pool: Vec<f64> = entropy
            .iter()
            .zip(labels)
            .filter(|(_, label)| **label == 1)
            .map(|(h, _)| *h)
            .collect();
        let mean = stats::mean(&pool)?;
        let std = stats::population_std(&pool)?;
        Some(Self {
            high: mean + HIGH_STD_SCALE * std,
            low: mean - LOW_STD_SCALE * std,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Out,
    In { start: usize },
}

/// Hysteresis state machine turning entropy and labels into time segments.
#[derive(Clone, Debug)]
pub struct SegmentExtractor {
    config: SegmentConfig,
}

impl SegmentExtractor {
    pub fn new(config: SegmentConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SegmentConfig {
        &self.config
    }

    pub fn extract(
        &self,
        inputs: &SegmentInputs<'_>,
    ) -> Result<Analysis<Vec<Segment>>, AnalysisError> {
        let n = inputs.validate()?;
        let mut diagnostics = Diagnostics::for_algorithm("segment_extractor");
        diagnostics.n = n;
        diagnostics.d = 1;

        let Some(thresholds) = Thresholds::from_high_pool(inputs.entropy, inputs.labels) else {
            diagnostics.warn("no timestep is labeled high-information; no segments extracted");
            return Ok(Analysis::new(vec![], diagnostics));
        };
        tracing::debug!(
            t_high = thresholds.high,
            t_low = thresholds.low,
            "segment thresholds"
        );

        let k_start = self.config.k_start;
        let k_stop = self.config.k_stop;
        let mut segments = vec![];
        let mut state = State::Out;
        let mut good = 0usize;
        let mut bad = 0usize;
        let mut skipped = 0usize;

        for i in 0..n {
            if inputs.missing_fraction[i] > self.config.nan_thr {
                skipped += 1;
                continue;
            }
            let entropy = inputs.entropy[i];
            let label = inputs.labels[i];

            match state {
                State::Out => {
                    if entropy >= thresholds.high && label == 1 {
                        good += 1;
                    } else {
                        good = 0;
                    }
                    if good >= k_start {
                        // backdate to the first sample of the qualifying streak
                        state = State::In {
                            start: i + 1 - k_start,
                        };
                        bad = 0;
                    }
                }
                State::In { start } => {
                    if entropy <= thresholds.low || label == 0 {
                        bad += 1;
                    } else {
                        bad = 0;
                    }
                    if bad >= k_stop {
                        let end = i + 1 - k_stop;
                        push_segment(&mut segments, inputs.timestamps, start, end);
                        state = State::Out;
                        good = 0;
                    }
                }
            }
        }

        if let State::In { start } = state {
            push_segment(&mut segments, inputs.timestamps, start, n - 1);
            diagnostics.note("final segment left open; closed at the last timestamp");
        }

        diagnostics.note(format!(
            "t_high={}, t_low={}, k_start={k_start}, k_stop={k_stop}, nan_thr={}, skipped={skipped}, segments={}",
            thresholds.high,
            thresholds.low,
            self.config.nan_thr,
            segments.len()
        ));
        Ok(Analysis::new(segments, diagnostics))
    }
}

fn push_segment(segments: &mut Vec<Segment>, timestamps: &[f64], start: usize, end: usize) {
    let segment = Segment {
        start: timestamps[start],
        end: timestamps[end],
    };
    if segment.start < segment.end {
        segments.push(segment);
    } else {
        tracing::debug!(start, end, "dropping zero-length segment");
    }
}
