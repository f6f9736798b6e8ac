//! Semantic validation for configuration files.
//!
//! A config that deserializes can still be unusable: a zero line cap, a
//! malformed duration, or a regex that does not compile. These are caught here
//! before any collection work starts.

use chrono::format::{Item, StrftimeItems};
use chrono::TimeDelta;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

use super::Config;

/// Errors that can occur during semantic validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("max_lines must be at least 1")]
    ZeroMaxLines,

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("invalid duration {value:?}: {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("invalid regex {pattern:?} in {field}: {source}")]
    InvalidPattern {
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid time format {format:?} in {field}")]
    InvalidTimeFormat { field: String, format: String },

    #[error("dest_dir {} must be a relative path below the working directory", .path.display())]
    InvalidDestDir { path: PathBuf },
}

/// Parse a duration like `90m`, `6h`, `2d` or plain seconds.
pub fn parse_duration(value: &str) -> Result<TimeDelta, ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidDuration {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let text = value.trim();
    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    if digits.is_empty() {
        return Err(invalid("expected a number followed by s, m, h or d"));
    }
    let amount: i64 = digits.parse().map_err(|_| invalid("number out of range"))?;
    let unit_seconds = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        _ => return Err(invalid("unknown unit, expected s, m, h or d")),
    };
    if amount == 0 {
        return Err(invalid("duration must be greater than zero"));
    }

    amount
        .checked_mul(unit_seconds)
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| invalid("duration out of range"))
}

fn check_pattern(field: String, pattern: &str) -> Result<(), ValidationError> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|source| ValidationError::InvalidPattern {
            field,
            pattern: pattern.to_string(),
            source,
        })
}

fn check_time_format(field: String, format: &str) -> Result<(), ValidationError> {
    if format.is_empty() || StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ValidationError::InvalidTimeFormat {
            field,
            format: format.to_string(),
        });
    }
    Ok(())
}

/// Check that `dest_dir` names a directory strictly below the working
/// directory. The collector step removes it before each run.
pub fn validate_dest_dir(dest_dir: &Path) -> Result<(), ValidationError> {
    let mut components = dest_dir.components().peekable();
    let below = components.peek().is_some()
        && components.all(|c| matches!(c, Component::Normal(_)));
    if !below {
        return Err(ValidationError::InvalidDestDir {
            path: dest_dir.to_path_buf(),
        });
    }
    Ok(())
}

/// Validate a config after overrides have been applied.
pub fn validate_config(config: &Config) -> Result<(), ValidationError> {
    if config.max_lines == 0 {
        return Err(ValidationError::ZeroMaxLines);
    }
    if config.image.trim().is_empty() {
        return Err(ValidationError::Empty { field: "image" });
    }
    if config.bugzilla_url.trim().is_empty() {
        return Err(ValidationError::Empty {
            field: "bugzilla_url",
        });
    }
    if config.archive_base.trim().is_empty() {
        return Err(ValidationError::Empty {
            field: "archive_base",
        });
    }
    if config.collector.trim().is_empty() {
        return Err(ValidationError::Empty { field: "collector" });
    }
    validate_dest_dir(&config.dest_dir)?;
    if let Some(since) = &config.since {
        parse_duration(since)?;
    }

    for (i, pattern) in config.ignore_patterns.iter().enumerate() {
        check_pattern(format!("ignore_patterns[{}]", i), pattern)?;
    }
    for (i, rule) in config.rules.iter().enumerate() {
        check_pattern(format!("rules[{}].path_pattern", i), &rule.path_pattern)?;
        if let Some(pattern) = &rule.line_pattern {
            check_pattern(format!("rules[{}].line_pattern", i), pattern)?;
        }
        if let Some(format) = &rule.time_format {
            check_time_format(format!("rules[{}].time_format", i), format)?;
        }
    }
    Ok(())
}
