//! Per-line timestamp extraction.
//!
//! A parser applies a line-matching regex to find the timestamp token, then
//! parses that token with a `chrono` format string. Two families exist:
//!
//! - `node`: journal style `Oct 14 09:12:33`, no year. The year is inferred
//!   from the run clock: a month later than the current month belongs to the
//!   previous year. This only holds for windows much shorter than a year.
//! - `pod`: container log style `2026-10-14T09:12:33.123456789Z`, year
//!   included.

use crate::{RunClock, TimestampError};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default pattern for node journal lines.
pub const NODE_LINE_PATTERN: &str = r"^([A-Z][a-z]{2}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})";

/// Default format for node journal timestamps.
pub const NODE_TIME_FORMAT: &str = "%b %d %H:%M:%S";

/// Default pattern for container log lines written with `--timestamps`.
pub const POD_LINE_PATTERN: &str =
    r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2}))";

/// Default format for container log timestamps.
pub const POD_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";

/// Timestamp families found in a must-gather tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampFamily {
    /// Month name, day and time; year inferred.
    Node,
    /// Full ISO-8601 date-time.
    Pod,
}

impl TimestampFamily {
    /// Default line-matching pattern for this family.
    pub fn default_pattern(self) -> &'static str {
        match self {
            TimestampFamily::Node => NODE_LINE_PATTERN,
            TimestampFamily::Pod => POD_LINE_PATTERN,
        }
    }

    /// Default time format for this family.
    pub fn default_format(self) -> &'static str {
        match self {
            TimestampFamily::Node => NODE_TIME_FORMAT,
            TimestampFamily::Pod => POD_TIME_FORMAT,
        }
    }
}

impl std::fmt::Display for TimestampFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimestampFamily::Node => write!(f, "node"),
            TimestampFamily::Pod => write!(f, "pod"),
        }
    }
}

impl std::str::FromStr for TimestampFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "node" | "journal" => Ok(TimestampFamily::Node),
            "pod" | "container" | "iso8601" => Ok(TimestampFamily::Pod),
            _ => Err(format!("unknown timestamp family: {}", s)),
        }
    }
}

/// Extracts the timestamp of a single log line.
pub trait TimestampParser {
    /// Parse the timestamp carried by `line`.
    fn parse(&self, line: &str) -> Result<DateTime<Utc>, TimestampError>;
}

/// Regex + format parser for one timestamp family.
#[derive(Debug, Clone)]
pub struct PatternTimestampParser {
    family: TimestampFamily,
    pattern: Regex,
    format: String,
    clock: RunClock,
}

impl PatternTimestampParser {
    /// Create a parser with a custom pattern and format.
    ///
    /// The timestamp text is the first capture group of `pattern`, or the
    /// whole match when the pattern has no groups.
    pub fn new(
        family: TimestampFamily,
        pattern: &str,
        format: impl Into<String>,
        clock: RunClock,
    ) -> Result<Self, TimestampError> {
        Ok(Self {
            family,
            pattern: Regex::new(pattern)?,
            format: format.into(),
            clock,
        })
    }

    /// Create a parser using the family's default pattern and format.
    pub fn for_family(family: TimestampFamily, clock: RunClock) -> Self {
        Self {
            family,
            pattern: Regex::new(family.default_pattern()).expect("built-in pattern is valid"),
            format: family.default_format().to_string(),
            clock,
        }
    }

    pub fn family(&self) -> TimestampFamily {
        self.family
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    fn extract<'l>(&self, line: &'l str) -> Result<&'l str, TimestampError> {
        let caps = self
            .pattern
            .captures(line)
            .ok_or_else(|| TimestampError::NoMatch {
                pattern: self.pattern.as_str().to_string(),
            })?;
        let m = caps.get(1).or_else(|| caps.get(0));
        m.map(|m| m.as_str()).ok_or_else(|| TimestampError::NoMatch {
            pattern: self.pattern.as_str().to_string(),
        })
    }

    fn parse_node(&self, text: &str) -> Result<DateTime<Utc>, TimestampError> {
        // Journal output pads single-digit days with a space.
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let now = self.clock.now();

        // 2000 is a leap year, so Feb 29 survives the month probe.
        let probe = self.parse_naive_with_year(&text, 2000)?;
        let year = if probe.month() > now.month() {
            now.year() - 1
        } else {
            now.year()
        };

        let date = NaiveDate::from_ymd_opt(year, probe.month(), probe.day())
            .ok_or_else(|| TimestampError::InvalidDate {
                text: text.clone(),
                year,
            })?;
        Ok(date.and_time(probe.time()).and_utc())
    }

    fn parse_naive_with_year(&self, text: &str, year: i32) -> Result<NaiveDateTime, TimestampError> {
        let with_year = format!("{} {}", year, text);
        let format = format!("%Y {}", self.format);
        NaiveDateTime::parse_from_str(&with_year, &format).map_err(|source| {
            TimestampError::InvalidFormat {
                text: text.to_string(),
                format: self.format.clone(),
                source,
            }
        })
    }

    fn parse_pod(&self, text: &str) -> Result<DateTime<Utc>, TimestampError> {
        // `Z` is not accepted by `%:z`, spell it as an explicit offset.
        let normalized = match text.strip_suffix('Z') {
            Some(stem) => format!("{}+00:00", stem),
            None => text.to_string(),
        };
        if let Ok(dt) = DateTime::parse_from_str(&normalized, &self.format) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(text, &self.format)
            .map(|naive| naive.and_utc())
            .map_err(|source| TimestampError::InvalidFormat {
                text: text.to_string(),
                format: self.format.clone(),
                source,
            })
    }
}

impl TimestampParser for PatternTimestampParser {
    fn parse(&self, line: &str) -> Result<DateTime<Utc>, TimestampError> {
        let text = self.extract(line)?;
        match self.family {
            TimestampFamily::Node => self.parse_node(text),
            TimestampFamily::Pod => self.parse_pod(text),
        }
    }
}
