// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Typical operating range of a 1-D variable from a Gaussian mixture fit.

pub mod estimator;
pub mod mixture;

pub use estimator::{RangeConfig, RangeEstimator};
pub use mixture::{GaussianComponent, MixtureConfig, MixtureFit, fit_gaussian_mixture};

pub fn crate_name() -> &'static str {
    let _ = sigrec_core::crate_name();
    "sigrec-range"
}
