//! Upload state machine.

use crate::{
    AttachmentRequest, BugTracker, Credential, ErrorClassification, Prompter, Result,
    UploadError, ATTACHMENT_CONTENT_TYPE, ATTACHMENT_SUMMARY,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, info, warn};

/// Base64-encode an archive for the `data` field.
pub fn encode_payload(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Parse a prompted bug id; only positive integers are accepted.
pub fn parse_bug_id(text: &str) -> Option<u64> {
    text.trim().parse::<u64>().ok().filter(|id| *id > 0)
}

/// Parameters of the collection, rendered into the attachment comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSummary {
    /// Collector image; `None` when an existing tree was reused.
    pub image: Option<String>,
    pub max_lines: usize,
    /// Time window as given on the command line, e.g. `6h`.
    pub since: Option<String>,
    pub files_seen: usize,
    pub trimmed_files: usize,
}

impl CollectionSummary {
    pub fn to_comment(&self) -> String {
        let mut comment = match &self.image {
            Some(image) => format!("must-gather output collected with image {image}.\n"),
            None => "must-gather output from an existing collection.\n".to_string(),
        };
        comment.push_str(&format!(
            "Files over {} lines were trimmed to their last {} lines.\n",
            self.max_lines, self.max_lines
        ));
        if let Some(since) = &self.since {
            comment.push_str(&format!(
                "Timestamped logs were trimmed to the last {since}.\n"
            ));
        }
        comment.push_str(&format!(
            "{} of {} files trimmed.",
            self.trimmed_files, self.files_seen
        ));
        comment
    }
}

/// How the session authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMode {
    /// Non-interactive; any error ends the session.
    ApiKey(String),
    /// Username and password prompted, re-prompted on recoverable errors.
    Interactive,
}

impl std::fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::ApiKey(_) => f.write_str("ApiKey(***)"),
            AuthMode::Interactive => f.write_str("Interactive"),
        }
    }
}

/// Everything a session needs besides the payload.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub bug_id: u64,
    pub file_name: String,
    pub comment: String,
    pub mode: AuthMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Submitting,
    Classifying(ErrorClassification),
    Retrying,
    Success,
    Fatal,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    BlankUsername,
    BlankBugId,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::BlankUsername => f.write_str("username left blank"),
            AbortReason::BlankBugId => f.write_str("bug id left blank"),
        }
    }
}

/// How a session ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Attached { bug_id: u64, submissions: usize },
    Aborted { reason: AbortReason, submissions: usize },
}

/// Drives submissions of one payload until success, a fatal reply, or a
/// blank answer.
pub struct UploadSession<'a, T: BugTracker + ?Sized, P: Prompter + ?Sized> {
    tracker: &'a T,
    prompter: &'a mut P,
    state: SessionState,
    submissions: usize,
}

impl<'a, T: BugTracker + ?Sized, P: Prompter + ?Sized> UploadSession<'a, T, P> {
    pub fn new(tracker: &'a T, prompter: &'a mut P) -> Self {
        Self {
            tracker,
            prompter,
            state: SessionState::Idle,
            submissions: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn submissions(&self) -> usize {
        self.submissions
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "Upload state");
        self.state = next;
    }

    fn abort(&mut self, reason: AbortReason, message: &str) -> Result<UploadOutcome> {
        self.prompter.notify(message);
        self.transition(SessionState::Aborted);
        info!(reason = %reason, submissions = self.submissions, "Upload aborted");
        Ok(UploadOutcome::Aborted {
            reason,
            submissions: self.submissions,
        })
    }

    /// Submit `payload` (already base64-encoded) to the tracker.
    pub fn run(&mut self, config: &UploadConfig, payload: &str) -> Result<UploadOutcome> {
        let interactive = matches!(config.mode, AuthMode::Interactive);
        let mut credential = match &config.mode {
            AuthMode::ApiKey(key) => Credential::api_key(key.clone()),
            AuthMode::Interactive => {
                let username = self.prompter.read_line("Enter Bugzilla username: ")?;
                if username.is_empty() {
                    return self.abort(AbortReason::BlankUsername, "Username left blank, exiting");
                }
                let password = self.prompter.read_secret("Enter Bugzilla password: ")?;
                Credential::login(username, password)
            }
        };
        let mut bug_id = config.bug_id;

        loop {
            self.transition(SessionState::Submitting);
            let request = AttachmentRequest {
                auth: &credential,
                ids: [bug_id],
                comment: &config.comment,
                summary: ATTACHMENT_SUMMARY,
                content_type: ATTACHMENT_CONTENT_TYPE,
                file_name: &config.file_name,
                data: payload,
            };
            self.submissions += 1;
            info!(bug_id, submission = self.submissions, "Submitting attachment");
            let reply = match self.tracker.attach(bug_id, &request) {
                Ok(reply) => reply,
                Err(e) => {
                    self.transition(SessionState::Fatal);
                    return Err(e);
                }
            };

            let Some(err) = reply.error() else {
                self.transition(SessionState::Success);
                info!(bug_id, submissions = self.submissions, "Attachment accepted");
                return Ok(UploadOutcome::Attached {
                    bug_id,
                    submissions: self.submissions,
                });
            };

            let class = ErrorClassification::from_code(err.code);
            self.transition(SessionState::Classifying(class));
            if !interactive || !class.is_recoverable() {
                warn!(code = ?err.code, message = %err.message, "Attachment rejected");
                self.prompter.notify(&err.message);
                self.transition(SessionState::Fatal);
                return Err(UploadError::Rejected {
                    code: err.code,
                    message: err.message,
                });
            }

            match class {
                ErrorClassification::InvalidCredentials => {
                    self.prompter.notify("Incorrect username or password.");
                    let username = self
                        .prompter
                        .read_line("Username (leave blank to exit): ")?;
                    if username.is_empty() {
                        return self
                            .abort(AbortReason::BlankUsername, "Username left blank, exiting");
                    }
                    let password = self.prompter.read_secret("Password: ")?;
                    credential = Credential::login(username, password);
                }
                _ => {
                    self.prompter.notify("Invalid bug id");
                    match self.prompt_bug_id()? {
                        Some(id) => bug_id = id,
                        None => {
                            return self.abort(AbortReason::BlankBugId, "ID left blank, exiting")
                        }
                    }
                }
            }
            self.transition(SessionState::Retrying);
        }
    }

    /// Ask until a positive integer or a blank answer.
    fn prompt_bug_id(&mut self) -> Result<Option<u64>> {
        loop {
            let answer = self
                .prompter
                .read_line("Enter a new bug id (leave blank to exit): ")?;
            if answer.is_empty() {
                return Ok(None);
            }
            if let Some(id) = parse_bug_id(&answer) {
                return Ok(Some(id));
            }
            self.prompter
                .notify("Could not parse bug id as valid, try again");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_payload() {
        assert_eq!(encode_payload(b"hello"), "aGVsbG8=");
        assert_eq!(encode_payload(&[0x1f, 0x8b, 0x08]), "H4sI");
    }

    #[test]
    fn test_parse_bug_id() {
        assert_eq!(parse_bug_id("1234"), Some(1234));
        assert_eq!(parse_bug_id(" 7 "), Some(7));
        assert_eq!(parse_bug_id("0"), None);
        assert_eq!(parse_bug_id("-3"), None);
        assert_eq!(parse_bug_id("abc"), None);
    }

    #[test]
    fn test_comment_mentions_parameters() {
        let summary = CollectionSummary {
            image: Some("quay.io/kubevirt/must-gather".to_string()),
            max_lines: 100_000,
            since: Some("6h".to_string()),
            files_seen: 40,
            trimmed_files: 3,
        };
        let comment = summary.to_comment();
        assert!(comment.contains("quay.io/kubevirt/must-gather"));
        assert!(comment.contains("100000 lines"));
        assert!(comment.contains("last 6h"));
        assert!(comment.ends_with("3 of 40 files trimmed."));
    }

    #[test]
    fn test_comment_without_window() {
        let comment = CollectionSummary {
            max_lines: 10,
            ..Default::default()
        }
        .to_comment();
        assert!(comment.starts_with("must-gather output from an existing collection."));
        assert!(!comment.contains("Timestamped"));
    }

    #[test]
    fn test_auth_mode_debug_masks_key() {
        assert_eq!(format!("{:?}", AuthMode::ApiKey("k3y".into())), "ApiKey(***)");
    }
}
