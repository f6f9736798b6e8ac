//! Bugzilla REST request and response shapes.

use serde::Serialize;
use serde_json::Value;

/// Error code for an invalid username or password.
pub const CODE_INVALID_CREDENTIALS: i64 = 300;

/// Error code for an invalid or unknown bug id.
pub const CODE_INVALID_BUG_ID: i64 = 101;

/// Fixed attachment summary.
pub const ATTACHMENT_SUMMARY: &str = "Result from must-gather command";

/// MIME type of the attached archive.
pub const ATTACHMENT_CONTENT_TYPE: &str = "application/gzip";

/// Authentication fields of a request.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Credential {
    ApiKey { api_key: String },
    Login { username: String, password: String },
}

impl Credential {
    pub fn api_key(key: impl Into<String>) -> Self {
        Credential::ApiKey {
            api_key: key.into(),
        }
    }

    pub fn login(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credential::Login {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::ApiKey { .. } => f.write_str("ApiKey(***)"),
            Credential::Login { username, .. } => write!(f, "Login({username}, ***)"),
        }
    }
}

/// Body of `POST /rest/bug/{id}/attachment`.
///
/// Borrows the encoded payload so retries do not copy it.
#[derive(Serialize)]
pub struct AttachmentRequest<'a> {
    #[serde(flatten)]
    pub auth: &'a Credential,
    pub ids: [u64; 1],
    pub comment: &'a str,
    pub summary: &'a str,
    pub content_type: &'a str,
    pub file_name: &'a str,
    pub data: &'a str,
}

/// Error carried by a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: Option<i64>,
    pub message: String,
}

/// A parsed JSON response and its HTTP status.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiReply {
    pub status: u16,
    pub body: Value,
}

impl ApiReply {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// The reported error, if the body has a non-null `error` field.
    pub fn error(&self) -> Option<ApiError> {
        match self.body.get("error") {
            None | Some(Value::Null) => None,
            Some(_) => Some(ApiError {
                code: self.body.get("code").and_then(Value::as_i64),
                message: self
                    .body
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            }),
        }
    }
}

/// Meaning of a response for the retry state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    None,
    InvalidCredentials,
    InvalidIdentifier,
    Fatal,
}

impl ErrorClassification {
    /// Classify an error code.
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(CODE_INVALID_CREDENTIALS) => ErrorClassification::InvalidCredentials,
            Some(CODE_INVALID_BUG_ID) => ErrorClassification::InvalidIdentifier,
            _ => ErrorClassification::Fatal,
        }
    }

    /// Classify a whole response.
    pub fn of(reply: &ApiReply) -> Self {
        match reply.error() {
            None => ErrorClassification::None,
            Some(err) => Self::from_code(err.code),
        }
    }

    /// Whether a corrected prompt answer can lead to success.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            ErrorClassification::InvalidCredentials | ErrorClassification::InvalidIdentifier
        )
    }
}
