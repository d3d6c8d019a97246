//! Error types for the evaluation harness.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur in the evaluation harness.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration file or value error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The query service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP transport failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// A response body could not be decoded.
    #[error("Failed to parse response: {0}")]
    ResponseParse(String),

    /// The query engine reported a failure while running a query.
    #[error("Query execution failed: {0}")]
    Execution(String),

    /// A test-case file was rejected as a whole.
    #[error("Test case import rejected: {0}")]
    Import(String),

    /// The test suite already holds its maximum number of cases.
    #[error("Test suite is full ({capacity} cases maximum)")]
    SuiteFull { capacity: usize },

    /// An index-addressed removal pointed past the end of a sequence.
    #[error("Index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Manual and automated records were handed to one aggregation call.
    #[error("Cannot aggregate manual and automated records together")]
    MixedRecordModes,
}

impl EvalError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for EvalError {
    fn from(err: reqwest::Error) -> Self {
        EvalError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for EvalError {
    fn from(err: serde_json::Error) -> Self {
        EvalError::ResponseParse(err.to_string())
    }
}

impl From<csv::Error> for EvalError {
    fn from(err: csv::Error) -> Self {
        EvalError::Import(err.to_string())
    }
}
