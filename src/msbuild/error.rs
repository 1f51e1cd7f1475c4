//! Error types for the msbuild module
//!
//! Errors raised while reading, editing or writing project descriptors.

use std::path::PathBuf;
use thiserror::Error;

use crate::identifier::IdentifierError;

/// Main error type for project descriptor operations
#[derive(Error, Debug)]
pub enum ProjectError {
    /// IO errors (reading or persisting the descriptor)
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// The descriptor is not well-formed XML
    #[error("XML parsing error in {file:?}: {message}")]
    Xml { file: PathBuf, message: String },

    /// The descriptor does not exist on disk
    #[error("Project not found: {path:?}")]
    NotFound { path: PathBuf },

    /// Save was called on a descriptor that is not bound to a path
    #[error("Project has no path to save to")]
    NoPath,

    /// No property group matches the requested configuration
    #[error("Configuration '{name}' not found")]
    ConfigurationNotFound { name: String },

    /// A GUID-valued property could not be parsed
    #[error("Invalid identifier in project: {source}")]
    InvalidIdentifier {
        #[source]
        source: IdentifierError,
    },
}

/// Result type alias for project operations
pub type ProjectResult<T> = Result<T, ProjectError>;

impl From<std::io::Error> for ProjectError {
    fn from(err: std::io::Error) -> Self {
        ProjectError::Io {
            source: err,
            message: "IO operation failed".to_string(),
        }
    }
}

impl From<IdentifierError> for ProjectError {
    fn from(source: IdentifierError) -> Self {
        ProjectError::InvalidIdentifier { source }
    }
}

/// Helper trait for converting IO errors with context
pub trait IoContext<T> {
    fn with_io_context(self, message: &str) -> ProjectResult<T>;
}

impl<T> IoContext<T> for Result<T, std::io::Error> {
    fn with_io_context(self, message: &str) -> ProjectResult<T> {
        self.map_err(|e| ProjectError::Io {
            message: message.to_string(),
            source: e,
        })
    }
}
