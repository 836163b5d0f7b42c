// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::AnalysisError;

/// Ascending interior class boundaries for a 1-D distribution.
pub type BreakSet = Vec<f64>;

/// One channel as supplied by a fetch collaborator.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelData {
    pub name: String,
    /// Seconds, ascending.
    pub timestamps: Vec<f64>,
    /// Same length as `timestamps`; `NaN` marks a missing sample.
    pub values: Vec<f64>,
}

impl ChannelData {
    pub fn new(name: impl Into<String>, timestamps: Vec<f64>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            timestamps,
            values,
        }
    }
}

/// How channels are placed on a shared timestamp axis.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlignmentPolicy {
    /// Use the first channel's timestamps for every channel; only lengths are checked.
    #[default]
    SharedAxis,
    /// Additionally require identical, non-decreasing timestamps on every channel.
    Strict,
}

/// Multi-channel samples on one timestamp axis, stored channel-major.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiChannelSeries {
    timestamps: Vec<f64>,
    names: Vec<String>,
    channels: Vec<Vec<f64>>,
}

impl MultiChannelSeries {
    /// Builds a series from a shared axis and named value columns.
    pub fn new(
        timestamps: Vec<f64>,
        channels: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, AnalysisError> {
        if channels.is_empty() {
            return Err(AnalysisError::invalid_input(
                "a series requires at least one channel",
            ));
        }
        if timestamps.is_empty() {
            return Err(AnalysisError::invalid_input(
                "a series requires at least one timestamp",
            ));
        }
        if let Some((idx, ts)) = timestamps.iter().enumerate().find(|(_, t)| !t.is_finite()) {
            return Err(AnalysisError::invalid_input(format!(
                "timestamps must be finite: index {idx} has {ts}"
            )));
        }

        let n = timestamps.len();
        let mut names = Vec::with_capacity(channels.len());
        let mut columns = Vec::with_capacity(channels.len());
        for (name, values) in channels {
            if values.len() != n {
                return Err(AnalysisError::invalid_input(format!(
                    "channel '{name}' has {} values but the timestamp axis has {n}",
                    values.len()
                )));
            }
            names.push(name);
            columns.push(values);
        }

        Ok(Self {
            timestamps,
            names,
            channels: columns,
        })
    }

    /// Aligns raw channels on the first channel's timestamp axis.
    pub fn align(
        channels: Vec<ChannelData>,
        policy: AlignmentPolicy,
    ) -> Result<Self, AnalysisError> {
        let mut iter = channels.into_iter();
        let first = iter.next().ok_or_else(|| {
            AnalysisError::invalid_input("at least one channel is required for alignment")
        })?;

        if first.timestamps.len() != first.values.len() {
            return Err(AnalysisError::invalid_input(format!(
                "channel '{}' has {} timestamps but {} values",
                first.name,
                first.timestamps.len(),
                first.values.len()
            )));
        }
        if policy == AlignmentPolicy::Strict
            && let Some(idx) = first.timestamps.windows(2).position(|w| w[1] < w[0])
        {
            return Err(AnalysisError::invalid_input(format!(
                "channel '{}' timestamps decrease at index {}",
                first.name,
                idx + 1
            )));
        }

        let axis = first.timestamps;
        let mut columns = vec![(first.name, first.values)];
        for channel in iter {
            if policy == AlignmentPolicy::Strict && channel.timestamps != axis {
                return Err(AnalysisError::invalid_input(format!(
                    "channel '{}' does not share the first channel's timestamp axis",
                    channel.name
                )));
            }
            columns.push((channel.name, channel.values));
        }

        Self::new(axis, columns)
    }

    /// Number of timesteps.
    pub fn n(&self) -> usize {
        self.timestamps.len()
    }

    /// Number of channels.
    pub fn d(&self) -> usize {
        self.channels.len()
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn channel(&self, idx: usize) -> Option<&[f64]> {
        self.channels.get(idx).map(Vec::as_slice)
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f64]> {
        self.channels.iter().map(Vec::as_slice)
    }

    /// Fraction of channels missing (`NaN`) at each timestep.
    pub fn missing_fraction(&self) -> Vec<f64> {
        let d = self.d() as f64;
        (0..self.n())
            .map(|t| {
                let missing = self.channels.iter().filter(|col| col[t].is_nan()).count();
                missing as f64 / d
            })
            .collect()
    }
}

/// A recommended time window, in the series' timestamp units.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A robust `[lower, upper]` operating range.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangeBound {
    pub lower: f64,
    pub upper: f64,
}

impl RangeBound {
    pub fn as_array(&self) -> [f64; 2] {
        [self.lower, self.upper]
    }
}
