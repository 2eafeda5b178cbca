//! Error types for the data-loader crate.

use thiserror::Error;

/// Errors that can occur while loading, validating or splitting interactions
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Line in data file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// An interaction record failed validation.
    ///
    /// Rejects the whole batch; `index` is the zero-based position of the
    /// first offending record.
    #[error("Validation failed for record {index}: {reason}")]
    ValidationError { index: usize, reason: String },

    /// Split fraction outside of [0, 1]
    #[error("Invalid split fraction: {0} (expected a value in [0, 1])")]
    InvalidFraction(f64),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
