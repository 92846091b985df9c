use std::path::{Path, PathBuf};

use thiserror::Error;

/// Core error type shared across sitcorpus crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem failure while reading or writing an artifact.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// An artifact could not be written in place.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// JSON encoding or decoding failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Mapping ledger could not be read or written.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// A representation could not encode a document.
    #[error("representation '{id}' failed: {message}")]
    Representation { id: String, message: String },
    /// Catch-all error for invalid inputs.
    #[error("invalid input: {0}")]
    Invalid(String),
}

impl Error {
    pub fn write(path: &Path, source: std::io::Error) -> Self {
        Error::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Convenience alias for results returned by sitcorpus crates.
pub type Result<T> = std::result::Result<T, Error>;
