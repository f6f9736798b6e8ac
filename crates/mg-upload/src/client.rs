//! Blocking Bugzilla REST client.

use crate::{ApiReply, AttachmentRequest, Result, UploadError};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Default tracker base URL.
pub const DEFAULT_BUGZILLA_URL: &str = "https://bugzilla.redhat.com";

/// Uploads of large bundles take a while; nothing is retried on timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// The two tracker calls the pipeline makes.
pub trait BugTracker {
    /// `GET /rest/bug/{id}`.
    fn check_bug(&self, bug_id: u64, api_key: Option<&str>) -> Result<ApiReply>;

    /// `POST /rest/bug/{id}/attachment`.
    fn attach(&self, bug_id: u64, request: &AttachmentRequest<'_>) -> Result<ApiReply>;
}

/// [`BugTracker`] over HTTP with `ureq`.
pub struct BugzillaClient {
    base_url: String,
    agent: ureq::Agent,
}

impl BugzillaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self { base_url, agent }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn bug_url(&self, bug_id: u64) -> String {
        format!("{}/rest/bug/{}", self.base_url, bug_id)
    }

    /// Turn a ureq result into a reply.
    ///
    /// Non-2xx statuses still carry a JSON body that is classified like any
    /// other; only transport failures become errors.
    fn into_reply(result: std::result::Result<ureq::Response, ureq::Error>) -> Result<ApiReply> {
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(t)) => return Err(UploadError::Transport(t.to_string())),
        };

        let status = response.status();
        let text = response
            .into_string()
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let body: Value =
            serde_json::from_str(&text).map_err(|e| UploadError::InvalidResponse {
                status,
                message: e.to_string(),
            })?;
        debug!(status, "Tracker replied");
        Ok(ApiReply::new(status, body))
    }
}

impl Default for BugzillaClient {
    fn default() -> Self {
        Self::new(DEFAULT_BUGZILLA_URL)
    }
}

impl BugTracker for BugzillaClient {
    fn check_bug(&self, bug_id: u64, api_key: Option<&str>) -> Result<ApiReply> {
        let mut request = self
            .agent
            .get(&self.bug_url(bug_id))
            .set("Accept", "application/json");
        if let Some(key) = api_key {
            request = request.query("api_key", key);
        }
        Self::into_reply(request.call())
    }

    fn attach(&self, bug_id: u64, request: &AttachmentRequest<'_>) -> Result<ApiReply> {
        let url = format!("{}/attachment", self.bug_url(bug_id));
        debug!(url = %url, bytes = request.data.len(), "Submitting attachment");
        Self::into_reply(
            self.agent
                .post(&url)
                .set("Accept", "application/json")
                .send_json(request),
        )
    }
}

/// Confirm the bug exists and is visible before any collection work.
pub fn verify_bug<T: BugTracker + ?Sized>(
    tracker: &T,
    bug_id: u64,
    api_key: Option<&str>,
) -> Result<()> {
    let reply = tracker.check_bug(bug_id, api_key)?;
    if let Some(err) = reply.error() {
        return Err(UploadError::BugNotFound {
            bug_id,
            message: err.message,
        });
    }
    info!(bug_id, "Bug confirmed");
    Ok(())
}
