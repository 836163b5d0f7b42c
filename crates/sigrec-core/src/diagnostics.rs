// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::time::Instant;

/// Diagnostics schema version for analysis run metadata.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// Structured diagnostics captured from one analysis run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostics {
    /// Number of samples the algorithm actually consumed.
    pub n: usize,
    /// Number of channels (1 for univariate tools).
    pub d: usize,
    pub schema_version: u32,
    pub engine_version: Option<String>,
    pub runtime_ms: Option<u64>,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
    pub algorithm: Cow<'static, str>,
    pub seed: Option<u64>,
    #[cfg(feature = "serde")]
    pub params_json: Option<serde_json::Value>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            n: 0,
            d: 0,
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            runtime_ms: None,
            notes: vec![],
            warnings: vec![],
            algorithm: Cow::Borrowed(""),
            seed: None,
            #[cfg(feature = "serde")]
            params_json: None,
        }
    }
}

impl Diagnostics {
    /// Starts an empty record for `algorithm`.
    pub fn for_algorithm(algorithm: &'static str) -> Self {
        Self {
            algorithm: Cow::Borrowed(algorithm),
            ..Self::default()
        }
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Records a warning and mirrors it to the `tracing` warn level.
    pub fn warn(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        tracing::warn!(algorithm = %self.algorithm, "{warning}");
        self.warnings.push(warning);
    }

    /// Sets `runtime_ms` from a start instant, saturating on overflow.
    pub fn finish(&mut self, started_at: Instant) {
        self.runtime_ms = Some(u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX));
    }

    /// Moves another record's notes and warnings into this one, prefixed with its algorithm.
    pub fn absorb(&mut self, other: Diagnostics) {
        let prefix = other.algorithm;
        self.notes
            .extend(other.notes.into_iter().map(|note| format!("{prefix}: {note}")));
        self.warnings.extend(
            other
                .warnings
                .into_iter()
                .map(|warning| format!("{prefix}: {warning}")),
        );
    }
}
