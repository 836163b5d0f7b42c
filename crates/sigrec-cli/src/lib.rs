// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! JSON documents and tool runners behind the `sigrec` binary.

use serde::{Deserialize, Serialize};
use sigrec_breaks::{BreakConfig, BreakOptimizer, KSearchReport};
use sigrec_core::{
    Analysis, AnalysisError, AnalysisTool, BreakSet, ChannelData, Diagnostics, RangeBound, Segment,
};
use sigrec_range::{RangeConfig, RangeEstimator};
use sigrec_window::{TrainingWindowConfig, TrainingWindowSelector};

/// One channel of a `windows` input document; `null` values are missing samples.
#[derive(Clone, Debug, Deserialize)]
pub struct ChannelDocument {
    pub name: String,
    pub timestamps: Vec<f64>,
    pub values: Vec<Option<f64>>,
}

impl From<ChannelDocument> for ChannelData {
    fn from(doc: ChannelDocument) -> Self {
        let values = doc
            .values
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        ChannelData::new(doc.name, doc.timestamps, values)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SeriesDocument {
    pub channels: Vec<ChannelDocument>,
}

/// A 1-D input: either a bare array or `{"values": [...]}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ValuesDocument {
    Bare(Vec<Option<f64>>),
    Wrapped { values: Vec<Option<f64>> },
}

impl ValuesDocument {
    /// Values with missing entries as NaN, which the tools drop.
    pub fn into_values(self) -> Vec<f64> {
        let raw = match self {
            Self::Bare(values) | Self::Wrapped { values } => values,
        };
        raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
    }
}

/// Output envelope shared by every command.
#[derive(Clone, Debug, Serialize)]
pub struct ToolOutput<T> {
    pub result: T,
    pub diagnostics: Diagnostics,
}

impl<T> From<Analysis<T>> for ToolOutput<T> {
    fn from(analysis: Analysis<T>) -> Self {
        Self {
            result: analysis.value,
            diagnostics: analysis.diagnostics,
        }
    }
}

pub fn parse_series_document(raw: &str) -> Result<SeriesDocument, serde_json::Error> {
    serde_json::from_str(raw)
}

pub fn parse_values_document(raw: &str) -> Result<Vec<f64>, serde_json::Error> {
    serde_json::from_str::<ValuesDocument>(raw).map(ValuesDocument::into_values)
}

pub fn run_windows(
    doc: SeriesDocument,
    config: TrainingWindowConfig,
) -> Result<ToolOutput<Vec<Segment>>, AnalysisError> {
    let selector = TrainingWindowSelector::new(config)?;
    let channels: Vec<ChannelData> = doc.channels.into_iter().map(ChannelData::from).collect();
    Ok(selector.analyze(&channels)?.into())
}

pub fn run_breaks(
    values: &[f64],
    config: BreakConfig,
) -> Result<ToolOutput<BreakSet>, AnalysisError> {
    Ok(BreakOptimizer::new(config)?.analyze(values)?.into())
}

/// Like [`run_breaks`] but keeps the per-class-count scores; `null` when no search ran.
pub fn run_breaks_report(
    values: &[f64],
    config: BreakConfig,
) -> Result<ToolOutput<Option<KSearchReport>>, AnalysisError> {
    Ok(BreakOptimizer::new(config)?.analyze_report(values)?.into())
}

pub fn run_range(
    values: &[f64],
    config: RangeConfig,
) -> Result<ToolOutput<RangeBound>, AnalysisError> {
    Ok(RangeEstimator::new(config)?.analyze(values)?.into())
}

pub fn crate_name() -> &'static str {
    let _ = (
        sigrec_core::crate_name(),
        sigrec_window::crate_name(),
        sigrec_breaks::crate_name(),
        sigrec_range::crate_name(),
    );
    "sigrec-cli"
}
