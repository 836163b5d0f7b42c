// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{AnalysisError, Diagnostics};

/// A computed value together with the diagnostics of the run that produced it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis<T> {
    pub value: T,
    pub diagnostics: Diagnostics,
}

impl<T> Analysis<T> {
    pub fn new(value: T, diagnostics: Diagnostics) -> Self {
        Self { value, diagnostics }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Single-entry-point contract shared by every analysis tool.
///
/// Implementations are stateless between calls: a configured tool can be
/// shared across threads and invoked concurrently.
pub trait AnalysisTool: Send + Sync {
    type Input: ?Sized;
    type Output;

    /// Stable identifier used in diagnostics and by the CLI.
    fn name(&self) -> &'static str;

    /// Runs the analysis, returning the value with run diagnostics.
    fn analyze(&self, input: &Self::Input) -> Result<Analysis<Self::Output>, AnalysisError>;

    /// Runs the analysis and returns only the value.
    fn call(&self, input: &Self::Input) -> Result<Self::Output, AnalysisError> {
        self.analyze(input).map(Analysis::into_value)
    }
}
