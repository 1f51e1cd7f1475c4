//! Error types for solution files

use std::path::PathBuf;
use thiserror::Error;

use crate::identifier::IdentifierError;

#[derive(Error, Debug)]
pub enum SolutionError {
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Solution not found: {path:?}")]
    NotFound { path: PathBuf },

    /// Save was called on a solution that is not bound to a path
    #[error("Solution has no path to save to")]
    NoPath,

    /// A `Project(` line without its four quoted fields
    #[error("Malformed project line {line_number}: {line}")]
    MalformedProjectLine { line_number: usize, line: String },

    /// A `GlobalSection(` line without a section name
    #[error("Malformed section line {line_number}: {line}")]
    MalformedSectionLine { line_number: usize, line: String },

    #[error("Invalid identifier on line {line_number}: {value}")]
    InvalidIdentifier {
        line_number: usize,
        value: String,
        #[source]
        source: IdentifierError,
    },
}

pub type SolutionResult<T> = Result<T, SolutionError>;

impl From<std::io::Error> for SolutionError {
    fn from(err: std::io::Error) -> Self {
        SolutionError::Io {
            source: err,
            message: "IO operation failed".to_string(),
        }
    }
}

/// Helper trait for converting IO errors with context
pub trait IoContext<T> {
    fn with_io_context(self, message: &str) -> SolutionResult<T>;
}

impl<T> IoContext<T> for Result<T, std::io::Error> {
    fn with_io_context(self, message: &str) -> SolutionResult<T> {
        self.map_err(|e| SolutionError::Io {
            message: message.to_string(),
            source: e,
        })
    }
}
