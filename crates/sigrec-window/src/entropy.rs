// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use sigrec_core::{Analysis, AnalysisError, AnalysisTool, Diagnostics, MultiChannelSeries, stats};
use std::time::Instant;

const DEFAULT_WINDOW: usize = 300;
const DEFAULT_DECAY: f64 = 1.0;
const DEFAULT_BINS: usize = 10;

/// Configuration for [`EntropyProfiler`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct EntropyConfig {
    /// Trailing window length in samples.
    pub window: usize,
    /// Exponential decay rate applied across one full window.
    pub decay: f64,
    /// Histogram bin count per window.
    pub bins: usize,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            decay: DEFAULT_DECAY,
            bins: DEFAULT_BINS,
        }
    }
}

impl EntropyConfig {
    fn validate(&self) -> Result<(), AnalysisError> {
        if self.window == 0 {
            return Err(AnalysisError::invalid_input(
                "EntropyConfig.window must be >= 1; got 0",
            ));
        }
        if !self.decay.is_finite() || self.decay < 0.0 {
            return Err(AnalysisError::invalid_input(format!(
                "EntropyConfig.decay must be finite and >= 0.0; got {}",
                self.decay
            )));
        }
        if self.bins < 2 {
            return Err(AnalysisError::invalid_input(format!(
                "EntropyConfig.bins must be >= 2; got {}",
                self.bins
            )));
        }
        Ok(())
    }
}

/// Per-timestep information density of a series.
#[derive(Clone, Debug, PartialEq)]
pub struct EntropyProfile {
    /// Mean of forward and backward entropy after zero refilling.
    pub combined: Vec<f64>,
    pub forward: Vec<f64>,
    pub backward: Vec<f64>,
    /// Zero positions that received a neighborhood mean.
    pub refilled: usize,
}

/// Bidirectional decay-weighted Shannon entropy over a trailing window.
#[derive(Clone, Debug)]
pub struct EntropyProfiler {
    config: EntropyConfig,
    weights: Vec<f64>,
}

impl EntropyProfiler {
    pub fn new(config: EntropyConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let weights = decay_weights(config.window, config.decay);
        Ok(Self { config, weights })
    }

    pub fn config(&self) -> &EntropyConfig {
        &self.config
    }

    /// Computes the combined profile for `series`.
    pub fn profile(&self, series: &MultiChannelSeries) -> EntropyProfile {
        let normalized: Vec<Vec<f64>> = series.channels().map(normalize_channel).collect();
        let forward = self.directional_entropy(&normalized);

        let reversed: Vec<Vec<f64>> = normalized
            .iter()
            .map(|col| col.iter().rev().copied().collect())
            .collect();
        let mut backward = self.directional_entropy(&reversed);
        backward.reverse();

        let raw: Vec<f64> = forward
            .iter()
            .zip(&backward)
            .map(|(f, b)| 0.5 * (f + b))
            .collect();
        let (combined, refilled) = refill_zeros(&raw, self.config.window);

        EntropyProfile {
            combined,
            forward,
            backward,
            refilled,
        }
    }

    fn directional_entropy(&self, channels: &[Vec<f64>]) -> Vec<f64> {
        let n = channels.first().map_or(0, Vec::len);
        let mut out = vec![0.0; n];
        for (i, slot) in out.iter_mut().enumerate().skip(1) {
            let start = i.saturating_sub(self.config.window);
            let weights = &self.weights[self.weights.len() - (i - start)..];
            *slot = channels
                .iter()
                .map(|col| weighted_entropy(&col[start..i], weights, self.config.bins))
                .sum();
        }
        out
    }
}

impl AnalysisTool for EntropyProfiler {
    type Input = MultiChannelSeries;
    type Output = EntropyProfile;

    fn name(&self) -> &'static str {
        "entropy_profiler"
    }

    fn analyze(
        &self,
        series: &MultiChannelSeries,
    ) -> Result<Analysis<EntropyProfile>, AnalysisError> {
        let started_at = Instant::now();
        let profile = self.profile(series);

        let mut diagnostics = Diagnostics::for_algorithm(self.name());
        diagnostics.n = series.n();
        diagnostics.d = series.d();
        diagnostics.note(format!(
            "window={}, decay={}, bins={}, refilled={}",
            self.config.window, self.config.decay, self.config.bins, profile.refilled
        ));
        if profile.combined.iter().all(|&h| h == 0.0) {
            diagnostics.warn("entropy profile is identically zero");
        }
        diagnostics.finish(started_at);
        Ok(Analysis::new(profile, diagnostics))
    }
}

/// Weights for one full window, oldest first; the newest sample has weight 1.
fn decay_weights(window: usize, decay: f64) -> Vec<f64> {
    let step = if window > 1 {
        1.0 / (window - 1) as f64
    } else {
        0.0
    };
    (0..window)
        .map(|m| (-decay * (window - 1 - m) as f64 * step).exp())
        .collect()
}

/// Global min-max scaling; `NaN` passes through and a flat channel maps to 0.
fn normalize_channel(values: &[f64]) -> Vec<f64> {
    let Some((lo, hi)) = stats::min_max(values) else {
        return values.to_vec();
    };
    let range = hi - lo;
    values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                v
            } else if range > 0.0 {
                (v - lo) / range
            } else {
                0.0
            }
        })
        .collect()
}

/// Shannon entropy (bits) of a weighted equal-width histogram over the window's range.
///
/// Decay weights scale each sample's contribution to its bin. Multiplying the
/// values themselves by the weights would instead compress older samples
/// toward zero and change the histogram's shape, not just its mass.
fn weighted_entropy(values: &[f64], weights: &[f64], bins: usize) -> f64 {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    let mut count = 0usize;
    for &v in values.iter().filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
        count += 1;
    }
    if count < 2 || hi <= lo {
        return 0.0;
    }

    let width = (hi - lo) / bins as f64;
    let mut mass = vec![0.0; bins];
    let mut total = 0.0;
    for (&v, &w) in values.iter().zip(weights) {
        if !v.is_finite() {
            continue;
        }
        // the right edge belongs to the last bin
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        mass[idx] += w;
        total += w;
    }
    if total <= 0.0 {
        return 0.0;
    }

    let entropy: f64 = mass
        .iter()
        .filter(|&&m| m > 0.0)
        .map(|&m| {
            let p = m / total;
            -p * p.log2()
        })
        .sum();
    entropy.max(0.0)
}

/// Replaces exact zeros by the mean of non-zero values within `+/- window`.
fn refill_zeros(raw: &[f64], window: usize) -> (Vec<f64>, usize) {
    let n = raw.len();
    let mut prefix_sum = vec![0.0; n + 1];
    let mut prefix_count = vec![0usize; n + 1];
    for (i, &h) in raw.iter().enumerate() {
        let nonzero = h != 0.0;
        prefix_sum[i + 1] = prefix_sum[i] + if nonzero { h } else { 0.0 };
        prefix_count[i + 1] = prefix_count[i] + usize::from(nonzero);
    }

    let mut out = raw.to_vec();
    let mut refilled = 0;
    for (i, slot) in out.iter_mut().enumerate() {
        if *slot != 0.0 {
            continue;
        }
        let lo = i.saturating_sub(window);
        let hi = (i + window + 1).min(n);
        let count = prefix_count[hi] - prefix_count[lo];
        if count > 0 {
            *slot = (prefix_sum[hi] - prefix_sum[lo]) / count as f64;
            refilled += 1;
        }
    }
    (out, refilled)
}
