// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::jenks::JenksSweep;
use crate::knee::find_knee;
use crate::sampling::stratified_sample;
use sigrec_core::{Analysis, AnalysisError, AnalysisTool, BreakSet, Diagnostics, stats};
use std::time::Instant;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

const DEFAULT_MIN_DISTINCT: usize = 5;
const DEFAULT_MAX_CLASSES: usize = 10;
const DEFAULT_SAMPLE_CAP: usize = 10_000;
const DEFAULT_MAX_STRATA: usize = 100;
const DEFAULT_KNEE_SENSITIVITY: f64 = 1.0;

/// How the class count is picked from the per-`k` scores.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KSelection {
    /// Knee of the goodness-of-variance-fit curve; the largest `k` when there is none.
    #[default]
    Knee,
    /// Smallest Bayesian information criterion.
    Bic,
}

/// Configuration for [`BreakOptimizer`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct BreakConfig {
    /// Inputs with at most this many distinct values get no breaks.
    pub min_distinct: usize,
    pub max_classes: usize,
    /// Inputs longer than this are stratified-sampled down to about this size.
    pub sample_cap: usize,
    pub max_strata: usize,
    pub selection: KSelection,
    pub knee_sensitivity: f64,
    pub seed: u64,
}

impl Default for BreakConfig {
    fn default() -> Self {
        Self {
            min_distinct: DEFAULT_MIN_DISTINCT,
            max_classes: DEFAULT_MAX_CLASSES,
            sample_cap: DEFAULT_SAMPLE_CAP,
            max_strata: DEFAULT_MAX_STRATA,
            selection: KSelection::Knee,
            knee_sensitivity: DEFAULT_KNEE_SENSITIVITY,
            seed: 0,
        }
    }
}

impl BreakConfig {
    fn validate(&self) -> Result<(), AnalysisError> {
        if self.max_classes < 2 {
            return Err(AnalysisError::invalid_input(format!(
                "BreakConfig.max_classes must be >= 2; got {}",
                self.max_classes
            )));
        }
        if self.sample_cap <= self.max_classes {
            return Err(AnalysisError::invalid_input(format!(
                "BreakConfig.sample_cap must exceed max_classes={}; got {}",
                self.max_classes, self.sample_cap
            )));
        }
        if self.max_strata == 0 {
            return Err(AnalysisError::invalid_input(
                "BreakConfig.max_strata must be >= 1; got 0",
            ));
        }
        if !self.knee_sensitivity.is_finite() || self.knee_sensitivity < 0.0 {
            return Err(AnalysisError::invalid_input(format!(
                "BreakConfig.knee_sensitivity must be finite and >= 0.0; got {}",
                self.knee_sensitivity
            )));
        }
        Ok(())
    }
}

/// Fit statistics for one candidate class count.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ClassCountScore {
    pub k: usize,
    /// Goodness of variance fit, `(SST - SSW) / SST`.
    pub gvf: f64,
    pub pseudo_f: f64,
    pub bic: f64,
    pub ssw: f64,
    pub breaks: BreakSet,
}

/// Outcome of the class-count search.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct KSearchReport {
    pub selected_k: usize,
    pub scores: Vec<ClassCountScore>,
    /// Number of points the scores were computed on.
    pub n_used: usize,
    pub sampled: bool,
    /// Knee selection found no knee and fell back to the largest `k`.
    pub knee_fallback: bool,
}

impl KSearchReport {
    pub fn selected(&self) -> Option<&ClassCountScore> {
        self.scores.iter().find(|score| score.k == self.selected_k)
    }

    /// Boundaries of the selected class count.
    pub fn breaks(&self) -> BreakSet {
        self.selected()
            .map(|score| score.breaks.clone())
            .unwrap_or_default()
    }
}

/// Natural-break classification with an automatically chosen class count.
#[derive(Clone, Debug)]
pub struct BreakOptimizer {
    config: BreakConfig,
}

impl BreakOptimizer {
    pub fn new(config: BreakConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BreakConfig {
        &self.config
    }

    /// Scores every class count in `2..=max_k` and picks one.
    ///
    /// `data` must be finite and longer than `max_k`.
    pub fn search(&self, data: &[f64], max_k: usize) -> Result<KSearchReport, AnalysisError> {
        if max_k < 2 {
            return Err(AnalysisError::invalid_input(format!(
                "class-count search requires max_k >= 2; got {max_k}"
            )));
        }
        if data.len() <= max_k {
            return Err(AnalysisError::invalid_input(format!(
                "class-count search requires more than max_k={max_k} values; got {}",
                data.len()
            )));
        }
        if let Some((idx, value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(AnalysisError::invalid_input(format!(
                "class-count search input must be finite: index {idx} has {value}"
            )));
        }

        let sampled = data.len() > self.config.sample_cap;
        let sample = stratified_sample(
            data,
            self.config.sample_cap,
            self.config.max_strata,
            self.config.seed,
        )?;
        if sample.len() <= max_k {
            return Err(AnalysisError::invalid_input(format!(
                "stratified sample kept {} values, not enough for max_k={max_k}",
                sample.len()
            )));
        }

        let sst = stats::sum_squared_deviations(&sample);
        if !sst.is_finite() {
            return Err(AnalysisError::numerical_issue(format!(
                "total sum of squares overflowed ({sst}); rescale the data"
            )));
        }
        if sst <= 0.0 {
            return Err(AnalysisError::invalid_input(
                "class-count search requires non-constant data",
            ));
        }

        // sampling can drop rare levels; more classes than levels repeat boundaries
        let sample_distinct = stats::distinct_count(&sample);
        let max_k = if sample_distinct < max_k {
            tracing::debug!(
                max_k,
                sample_distinct,
                "capping class count at the sample's distinct values"
            );
            sample_distinct
        } else {
            max_k
        };

        let sweep = JenksSweep::new(&sample, max_k)?;
        let scores = score_class_counts(&sweep, &sample, sst, max_k)?;
        for score in &scores {
            tracing::debug!(
                k = score.k,
                gvf = score.gvf,
                pseudo_f = score.pseudo_f,
                bic = score.bic,
                "class count scored"
            );
        }

        let (selected_k, knee_fallback) = match self.config.selection {
            KSelection::Knee => {
                let ks: Vec<f64> = scores.iter().map(|score| score.k as f64).collect();
                let gvfs: Vec<f64> = scores.iter().map(|score| score.gvf).collect();
                match find_knee(&ks, &gvfs, self.config.knee_sensitivity) {
                    Some(idx) => (scores[idx].k, false),
                    None => (max_k, true),
                }
            }
            KSelection::Bic => (lowest_bic(&scores).unwrap_or(max_k), false),
        };

        Ok(KSearchReport {
            selected_k,
            scores,
            n_used: sample.len(),
            sampled,
            knee_fallback,
        })
    }

    /// Filters the input, handles near-discrete data, then runs [`Self::search`].
    ///
    /// `None` means the data has too few distinct values to classify.
    pub fn analyze_report(
        &self,
        data: &[f64],
    ) -> Result<Analysis<Option<KSearchReport>>, AnalysisError> {
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
        if finite.is_empty() {
            return Err(AnalysisError::invalid_input(
                "break optimization requires at least one finite value",
            ));
        }

        let distinct = stats::distinct_count(&finite);
        if distinct <= self.config.min_distinct {
            diagnostics.warn(format!(
                "only {distinct} distinct values (<= {}); no breaks computed",
                self.config.min_distinct
            ));
            diagnostics.finish(started_at);
            return Ok(Analysis::new(None, diagnostics));
        }

        let max_k = self.config.max_classes.min(distinct);
        let report = self.search(&finite, max_k)?;

        if report.sampled {
            diagnostics.note(format!(
                "stratified sample of {} from {} values",
                report.n_used,
                finite.len()
            ));
        }
        if report.knee_fallback {
            diagnostics.warn(format!(
                "no knee in the GVF curve; falling back to k={}",
                report.selected_k
            ));
        }
        #[cfg(feature = "rayon")]
        diagnostics.note(format!(
            "scored {} class counts on {} threads",
            report.scores.len(),
            rayon::current_num_threads()
        ));
        diagnostics.note(format!(
            "selection={:?}, max_k={max_k}, selected_k={}",
            self.config.selection, report.selected_k
        ));
        tracing::info!(
            selected_k = report.selected_k,
            max_k,
            n = finite.len(),
            "class count selected"
        );
        diagnostics.finish(started_at);
        Ok(Analysis::new(Some(report), diagnostics))
    }
}

impl AnalysisTool for BreakOptimizer {
    type Input = [f64];
    type Output = BreakSet;

    fn name(&self) -> &'static str {
        "break_optimizer"
    }

    fn analyze(&self, data: &[f64]) -> Result<Analysis<BreakSet>, AnalysisError> {
        let Analysis { value, diagnostics } = self.analyze_report(data)?;
        let breaks = value.map(|report| report.breaks()).unwrap_or_default();
        Ok(Analysis::new(breaks, diagnostics))
    }
}

fn score_class_counts(
    sweep: &JenksSweep,
    sample: &[f64],
    sst: f64,
    max_k: usize,
) -> Result<Vec<ClassCountScore>, AnalysisError> {
    let score = |k: usize| -> Result<ClassCountScore, AnalysisError> {
        let breaks = sweep.breaks(k)?;
        let ssw = digitized_ssw(sample, &breaks, k);
        Ok(class_count_score(k, breaks, ssw, sst, sample.len()))
    };

    #[cfg(feature = "rayon")]
    {
        (2..=max_k).into_par_iter().map(score).collect()
    }

    #[cfg(not(feature = "rayon"))]
    {
        (2..=max_k).map(score).collect()
    }
}

fn class_count_score(k: usize, breaks: BreakSet, ssw: f64, sst: f64, n: usize) -> ClassCountScore {
    let n_f = n as f64;
    let k_f = k as f64;
    let between = sst - ssw;
    ClassCountScore {
        k,
        gvf: between / sst,
        pseudo_f: (between / (k_f - 1.0)) / (ssw / (n_f - k_f)),
        bic: n_f * (ssw / n_f).ln() + k_f * n_f.ln(),
        ssw,
        breaks,
    }
}

/// Within-class sum of squares after assigning each value to the class
/// `breaks` puts it in. Boundaries are class maxima, so a value equal to a
/// boundary stays in the lower class.
fn digitized_ssw(values: &[f64], breaks: &[f64], classes: usize) -> f64 {
    let class_of = |v: f64| breaks.partition_point(|&b| b < v);

    let mut sums = vec![0.0; classes];
    let mut counts = vec![0_usize; classes];
    for &v in values {
        let class = class_of(v);
        sums[class] += v;
        counts[class] += 1;
    }
    let means: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(&sum, &count)| if count == 0 { 0.0 } else { sum / count as f64 })
        .collect();

    values
        .iter()
        .map(|&v| {
            let diff = v - means[class_of(v)];
            diff * diff
        })
        .sum()
}

fn lowest_bic(scores: &[ClassCountScore]) -> Option<usize> {
    let mut best: Option<&ClassCountScore> = None;
    for score in scores {
        if best.is_none_or(|current| score.bic.total_cmp(&current.bic).is_lt()) {
            best = Some(score);
        }
    }
    best.map(|score| score.k)
}
