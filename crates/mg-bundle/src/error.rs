//! Error types for bundle operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during bundle operations.
#[derive(Error, Debug)]
pub enum BundleError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tree root is missing or not a directory
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Tree has nothing to archive
    #[error("bundle has no content to write")]
    EmptyBundle,

    /// Originals could not be restored after archiving
    #[error("restore after archiving failed: {0}")]
    Restore(#[from] mg_trim::TrimError),
}

/// Result type alias for bundle operations.
pub type Result<T> = std::result::Result<T, BundleError>;
