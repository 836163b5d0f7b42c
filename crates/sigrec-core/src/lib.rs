// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Shared types and helpers for the sigrec analysis tools.

pub mod cluster;
pub mod diagnostics;
pub mod error;
pub mod rng;
pub mod series;
pub mod stats;
pub mod tool;

pub use cluster::{KMeansConfig, KMeansFit, kmeans_1d};
pub use diagnostics::{DIAGNOSTICS_SCHEMA_VERSION, Diagnostics};
pub use error::AnalysisError;
pub use rng::StableRng;
pub use series::{AlignmentPolicy, BreakSet, ChannelData, MultiChannelSeries, RangeBound, Segment};
pub use tool::{Analysis, AnalysisTool};

pub fn crate_name() -> &'static str {
    "sigrec-core"
}
