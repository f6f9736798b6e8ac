//! Error types for upload operations.

use thiserror::Error;

/// Errors that end an upload session.
#[derive(Error, Debug)]
pub enum UploadError {
    /// Connection, DNS or TLS failure; never retried
    #[error("network error: {0}")]
    Transport(String),

    /// The server answered with something that is not JSON
    #[error("invalid response (HTTP {status}): {message}")]
    InvalidResponse { status: u16, message: String },

    /// The pre-flight check did not confirm the bug
    #[error("bug {bug_id} not accessible: {message}")]
    BugNotFound { bug_id: u64, message: String },

    /// The server rejected the attachment with a terminal error
    #[error("Bugzilla rejected the attachment{}: {message}", .code.map(|c| format!(" (code {c})")).unwrap_or_default())]
    Rejected { code: Option<i64>, message: String },

    /// Reading interactive input failed
    #[error("prompt failed: {0}")]
    Prompt(#[from] std::io::Error),
}

/// Result type alias for upload operations.
pub type Result<T> = std::result::Result<T, UploadError>;
