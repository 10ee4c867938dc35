//! # Design
//!
//! - Constant-message errors for storage operations.
//! - Operation and path live in fields so callers can log them structurally.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors produced by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO failures while interacting with the filesystem.
    #[error("storage io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The filename carried no extension from the allow-list.
    #[error("unsupported file type")]
    UnsupportedFileType {
        /// Extension found on the filename, if any.
        value: Option<String>,
    },
    /// The requested artifact is malformed or absent from the output area.
    #[error("artifact not found")]
    ArtifactNotFound {
        /// Name supplied by the caller.
        name: String,
    },
}

impl StorageError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
