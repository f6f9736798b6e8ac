//! Bugzilla attachment upload for must-gather bundles.
//!
//! The upload is driven by [`UploadSession`], a small state machine:
//!
//! ```text
//! Idle -> Submitting -> Success
//!              |
//!              v
//!         Classifying -> Retrying -> Submitting
//!              |
//!              v
//!            Fatal
//! ```
//!
//! Server error codes are mapped to an [`ErrorClassification`]. With an API
//! key every error is terminal after one submission. With a username and
//! password, invalid credentials (300) and an invalid bug id (101) re-prompt
//! through a [`Prompter`] and resubmit the same encoded payload; a blank answer
//! aborts.

pub mod api;
pub mod client;
pub mod error;
pub mod prompt;
pub mod session;

pub use api::{
    ApiError, ApiReply, AttachmentRequest, Credential, ErrorClassification,
    ATTACHMENT_CONTENT_TYPE, ATTACHMENT_SUMMARY, CODE_INVALID_BUG_ID, CODE_INVALID_CREDENTIALS,
};
pub use client::{verify_bug, BugTracker, BugzillaClient, DEFAULT_BUGZILLA_URL};
pub use error::{Result, UploadError};
pub use prompt::{Prompter, TerminalPrompter};
pub use session::{
    encode_payload, parse_bug_id, AbortReason, AuthMode, CollectionSummary, SessionState, UploadConfig,
    UploadOutcome, UploadSession,
};
