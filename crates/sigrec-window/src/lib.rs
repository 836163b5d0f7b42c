// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Training window recommendation for multi-channel time series.
//!
//! The pipeline scores every timestep with a bidirectional, decay-weighted
//! Shannon entropy ([`EntropyProfiler`]), splits the scores into high and low
//! information with a seeded 2-cluster fit ([`DensityClassifier`]), and runs a
//! hysteresis state machine over both ([`SegmentExtractor`]).
//! [`TrainingWindowSelector`] wires the three together.

pub mod density;
pub mod entropy;
pub mod segment;
pub mod selector;

pub use density::{DensityClassifier, DensityConfig};
pub use entropy::{EntropyConfig, EntropyProfile, EntropyProfiler};
pub use segment::{SegmentConfig, SegmentExtractor, SegmentInputs, Thresholds};
pub use selector::{TrainingWindowConfig, TrainingWindowSelector};

pub fn crate_name() -> &'static str {
    let _ = sigrec_core::crate_name();
    "sigrec-window"
}
