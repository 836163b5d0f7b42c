// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Deterministic synthetic inputs shared by the benchmarks.

use sigrec_core::ChannelData;

pub fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

/// Uniform sample in `[0, 1)`.
pub fn lcg_unit(state: &mut u64) -> f64 {
    (lcg_next(state) >> 11) as f64 / (1_u64 << 53) as f64
}

/// Standard normal sample via Box-Muller.
pub fn lcg_gaussian(state: &mut u64) -> f64 {
    let u1 = 1.0 - lcg_unit(state);
    let u2 = lcg_unit(state);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// `d` channels of length `n`, flat except for a noisy burst over the middle fifth.
pub fn bursty_channels(n: usize, d: usize, seed: u64) -> Vec<ChannelData> {
    let mut state = seed;
    let timestamps: Vec<f64> = (0..n).map(|t| t as f64).collect();
    let burst = (2 * n / 5)..(3 * n / 5);
    (0..d)
        .map(|channel| {
            let values = (0..n)
                .map(|t| {
                    if burst.contains(&t) {
                        lcg_unit(&mut state) * (channel + 1) as f64
                    } else {
                        0.0
                    }
                })
                .collect();
            ChannelData::new(format!("ch{channel}"), timestamps.clone(), values)
        })
        .collect()
}

/// Mixture of `modes` unit-variance Gaussians spaced 10 apart.
pub fn multimodal(n: usize, modes: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|i| (i % modes.max(1)) as f64 * 10.0 + lcg_gaussian(&mut state))
        .collect()
}
