//! Error types for the memory bank.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the memory bank's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for memory bank operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Tag value failed validation
    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    /// Document path failed validation (empty, absolute, traversal)
    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    /// Branch name failed validation
    #[error("Invalid branch name: {0}")]
    InvalidBranch(String),

    /// Document on disk could not be parsed
    #[error("Invalid document {path}: {reason}")]
    InvalidDocument { path: String, reason: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Filesystem read/write failed for a reason other than "missing"
    #[error("Persistence error at {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a persistence error for the given path.
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is a persistence (environment) failure.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Persistence { .. } | Error::Io(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
