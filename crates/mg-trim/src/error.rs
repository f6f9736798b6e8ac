//! Error types for trimming operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating or parsing a line's timestamp.
#[derive(Error, Debug)]
pub enum TimestampError {
    /// The line-matching pattern did not match the line.
    #[error("no timestamp matching {pattern:?}")]
    NoMatch { pattern: String },

    /// The matched text could not be parsed with the configured format.
    #[error("cannot parse {text:?} with format {format:?}: {source}")]
    InvalidFormat {
        text: String,
        format: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The matched text parsed to a calendar date that does not exist.
    #[error("timestamp {text:?} does not name a valid date in {year}")]
    InvalidDate { text: String, year: i32 },

    /// The line-matching pattern is not a valid regex.
    #[error("invalid timestamp pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Errors that can occur while trimming a file or restoring backups.
#[derive(Error, Debug)]
pub enum TrimError {
    /// I/O error on a specific file
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A probed line carried no parsable timestamp
    #[error("timestamp error in '{}' at line {}: {source}", .path.display(), .line + 1)]
    Timestamp {
        path: PathBuf,
        line: usize,
        #[source]
        source: TimestampError,
    },

    /// Only regular files are backed up and trimmed
    #[error("not a regular file: '{}'", .0.display())]
    NotRegularFile(PathBuf),

    /// Invalid classification rule
    #[error("invalid rule pattern {pattern:?}: {source}")]
    Rule {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Some backups could not be put back; their staged copies are kept
    #[error("failed to restore {} file(s); originals kept in '{}'", .failed.len(), .staging.display())]
    RestoreFailed {
        failed: Vec<PathBuf>,
        staging: PathBuf,
    },
}

impl TrimError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TrimError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for trimming operations.
pub type Result<T> = std::result::Result<T, TrimError>;
