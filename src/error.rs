//! Error taxonomy for the comparison engine
//!
//! Statistical primitives return [`Result`]. The report assembler never
//! propagates these: each failure becomes a typed `None` block plus a
//! warning entry, so a partial report is always produced.

use thiserror::Error;

/// Errors that can occur while validating inputs or computing a statistic
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data: found {found} paired observations, need at least {required}")]
    InsufficientData { found: usize, required: usize },

    #[error("Zero-variance input: {0}")]
    DegenerateVariance(String),

    #[error("Numeric instability in {context}")]
    NumericInstability { context: String },

    #[error("Statistical routine failed: {0}")]
    StatisticalLibraryFailure(String),

    #[error("Invalid observation '{id}': {reason}")]
    InvalidObservation { id: String, reason: String },

    #[error("Duplicate experiment identifier: {0}")]
    DuplicateExperiment(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnalysisError {
    /// Wrap a distribution-construction or numeric routine error
    pub fn library<E: std::fmt::Display>(routine: &str, err: E) -> Self {
        Self::StatisticalLibraryFailure(format!("{}: {}", routine, err))
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, AnalysisError>;
