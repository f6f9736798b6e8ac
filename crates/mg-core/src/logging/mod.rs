//! Structured logging for mg-attach.
//!
//! Provides dual-mode logging:
//! - Human-readable console output for interactive use
//! - Machine-parseable JSONL for automation
//!
//! # Design Notes
//!
//! - stdout is reserved for the archive path and bug id
//! - stderr receives all log output (human or JSONL)
//! - every event inside a run span carries the run's `run_id`
//! - fields named like credentials are masked in JSONL output

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, Level, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Replacement text for masked values.
pub const MASK: &str = "***";

/// Crates whose events are shown at the configured level.
const LOG_TARGETS: &[&str] = &["mg_core", "mg_attach", "mg_trim", "mg_bundle", "mg_upload"];

/// Whether a field of this name may hold a credential.
pub fn is_secret_field(name: &str) -> bool {
    matches!(
        name,
        "password" | "passwd" | "api_key" | "apikey" | "token" | "secret"
    )
}

fn default_directives(level: LogLevel) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the logging subsystem.
///
/// Must be called once at startup before any logging occurs. `RUST_LOG`, when
/// set to a valid filter, replaces the per-crate defaults.
pub fn init_logging(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(config.level)));

    match config.format {
        LogFormat::Human => {
            let use_ansi = std::io::stderr().is_terminal();
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(use_ansi);

            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer)
                    .init();
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt_layer.without_time())
                    .init();
            }
        }
        LogFormat::Jsonl => {
            tracing_subscriber::registry()
                .with(filter)
                .with(JsonlLayer::stderr())
                .init();
        }
    }
}

/// Generate a unique run ID for this invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    // First 12 hex chars
    format!("run-{}", &uuid.simple().to_string()[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_run_id() {
        let id1 = generate_run_id();
        let id2 = generate_run_id();

        assert!(id1.starts_with("run-"));
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 16);
        assert!(id1[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_default_directives() {
        let d = default_directives(LogLevel::Debug);
        assert!(d.starts_with("mg_core=debug,"));
        assert!(d.contains("mg_upload=debug"));
    }

    #[test]
    fn test_secret_fields() {
        assert!(is_secret_field("password"));
        assert!(is_secret_field("api_key"));
        assert!(!is_secret_field("username"));
        assert!(!is_secret_field("path"));
    }
}
