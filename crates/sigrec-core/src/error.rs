// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use thiserror::Error;

/// Error returned by every fallible sigrec operation.
///
/// Degenerate-but-valid inputs never produce an error; they take an explicit
/// fallback path and record a warning in [`crate::Diagnostics`] instead.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// A precondition on the input data or the configuration does not hold.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A numerical fit could not produce a usable model.
    #[error("numerical issue: {0}")]
    NumericalIssue(String),
    /// The requested behavior is outside the implemented surface.
    #[error("not supported: {0}")]
    NotSupported(String),
    /// A size or counter guard tripped.
    #[error("resource limit: {0}")]
    ResourceLimit(String),
}

impl AnalysisError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    pub fn resource_limit(msg: impl Into<String>) -> Self {
        Self::ResourceLimit(msg.into())
    }

    /// Stable machine-readable code for this error class.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NumericalIssue(_) => "numerical_issue",
            Self::NotSupported(_) => "not_supported",
            Self::ResourceLimit(_) => "resource_limit",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AnalysisError;

    #[test]
    fn constructors_map_to_variants_and_codes() {
        let cases = [
            (AnalysisError::invalid_input("a"), "invalid_input"),
            (AnalysisError::numerical_issue("b"), "numerical_issue"),
            (AnalysisError::not_supported("c"), "not_supported"),
            (AnalysisError::resource_limit("d"), "resource_limit"),
        ];
        for (err, code) in cases {
            assert_eq!(err.code(), code);
        }
    }

    #[test]
    fn display_includes_class_and_message() {
        let err = AnalysisError::invalid_input("max_k must be >= 2; got 1");
        assert_eq!(err.to_string(), "invalid input: max_k must be >= 2; got 1");
    }
}
