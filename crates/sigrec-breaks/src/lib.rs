// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Natural-break classification of 1-D distributions.
//!
//! [`BreakOptimizer`] sweeps class counts with an exact Jenks partition,
//! scores each count by goodness of variance fit, pseudo-F and BIC, and
//! picks one by knee detection or minimum BIC.

pub mod jenks;
pub mod knee;
pub mod optimizer;
pub mod sampling;

pub use jenks::JenksSweep;
pub use knee::find_knee;
pub use optimizer::{BreakConfig, BreakOptimizer, ClassCountScore, KSearchReport, KSelection};
pub use sampling::stratified_sample;

pub fn crate_name() -> &'static str {
    let _ = sigrec_core::crate_name();
    "sigrec-breaks"
}
