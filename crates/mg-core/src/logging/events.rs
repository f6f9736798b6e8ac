//! Event vocabulary for structured logs.
//!
//! Pipeline events carry an `event` field naming one of [`event_names`] and
//! run inside a span recording the [`Stage`].

use serde::{Deserialize, Serialize};

/// Log levels for events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Bug-existence check.
    Preflight,
    /// Collector invocation.
    Collect,
    /// Per-file trimming.
    Trim,
    /// Archive construction and restore.
    Bundle,
    /// Attachment submission.
    Upload,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Preflight => "preflight",
            Stage::Collect => "collect",
            Stage::Trim => "trim",
            Stage::Bundle => "bundle",
            Stage::Upload => "upload",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Run lifecycle
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    // Config
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";

    // Preflight
    pub const BUG_CONFIRMED: &str = "preflight.bug_confirmed";

    // Collect
    pub const COLLECT_STARTED: &str = "collect.started";
    pub const COLLECT_FINISHED: &str = "collect.finished";
    pub const COLLECT_SKIPPED: &str = "collect.skipped";

    // Trim
    pub const TRIM_FINISHED: &str = "trim.finished";

    // Bundle
    pub const BUNDLE_WRITTEN: &str = "bundle.written";

    // Upload
    pub const UPLOAD_STARTED: &str = "upload.started";
    pub const UPLOAD_FINISHED: &str = "upload.finished";
    pub const UPLOAD_SKIPPED: &str = "upload.skipped";

    pub const INTERNAL_ERROR: &str = "internal_error";
}
