//! Configuration loading and validation for mg-attach.
//!
//! This module handles:
//! - Loading the JSON config file
//! - Config resolution order (CLI > env > XDG > defaults)
//! - Applying command-line overrides
//! - Semantic validation (line cap, durations, regexes)
//! - Building the trim classifier from the configured rules

pub mod validation;

pub use validation::{parse_duration, validate_config, validate_dest_dir, ValidationError};

use chrono::TimeDelta;
use mg_trim::tree::{DEFAULT_IGNORE_PATTERNS, DEFAULT_NODE_PATH_PATTERN, DEFAULT_POD_PATH_PATTERN};
use mg_trim::{
    Classifier, PatternTimestampParser, RunClock, TimestampError, TimestampFamily, TimestampRule,
    TrimError, DEFAULT_MAX_LINES,
};
use mg_upload::DEFAULT_BUGZILLA_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default XDG config directory name.
const CONFIG_DIR_NAME: &str = "mg-attach";

/// Config file name inside the config directory.
const CONFIG_FILE_NAME: &str = "config.json";

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "MG_CONFIG";

/// Default collector image.
pub const DEFAULT_IMAGE: &str = "quay.io/kubevirt/must-gather";

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Semantic validation failed: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Invalid trim rule: {0}")]
    Rule(#[from] TrimError),

    #[error("Invalid timestamp rule: {0}")]
    Timestamp(#[from] TimestampError),
}

/// One timestamp rule as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Regex over the `/`-separated path relative to the tree root.
    pub path_pattern: String,
    pub family: TimestampFamily,
    /// Regex locating the timestamp in a line; family default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_pattern: Option<String>,
    /// chrono format of the timestamp; family default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_format: Option<String>,
}

fn default_rules() -> Vec<RuleConfig> {
    vec![
        RuleConfig {
            path_pattern: DEFAULT_NODE_PATH_PATTERN.to_string(),
            family: TimestampFamily::Node,
            line_pattern: None,
            time_format: None,
        },
        RuleConfig {
            path_pattern: DEFAULT_POD_PATH_PATTERN.to_string(),
            family: TimestampFamily::Pod,
            line_pattern: None,
            time_format: None,
        },
    ]
}

/// Run configuration. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bugzilla_url: String,
    pub image: String,
    /// Collection directory, relative to the working directory.
    pub dest_dir: PathBuf,
    /// Archive name prefix.
    pub archive_base: String,
    pub max_lines: usize,
    /// Time window for timestamped logs, e.g. `6h`.
    pub since: Option<String>,
    pub rules: Vec<RuleConfig>,
    pub ignore_patterns: Vec<String>,
    /// Collector program; `adm must-gather` is passed to it.
    pub collector: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bugzilla_url: DEFAULT_BUGZILLA_URL.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            dest_dir: PathBuf::from("gather-files"),
            archive_base: "must-gather".to_string(),
            max_lines: DEFAULT_MAX_LINES,
            since: None,
            rules: default_rules(),
            ignore_patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            collector: "oc".to_string(),
        }
    }
}

/// Values from the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bugzilla_url: Option<String>,
    pub image: Option<String>,
    pub dest_dir: Option<PathBuf>,
    pub max_lines: Option<usize>,
    pub since: Option<String>,
}

impl Config {
    /// Apply command-line overrides.
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(url) = &overrides.bugzilla_url {
            self.bugzilla_url.clone_from(url);
        }
        if let Some(image) = &overrides.image {
            self.image.clone_from(image);
        }
        if let Some(dir) = &overrides.dest_dir {
            self.dest_dir.clone_from(dir);
        }
        if let Some(max) = overrides.max_lines {
            self.max_lines = max;
        }
        if let Some(since) = &overrides.since {
            self.since = Some(since.clone());
        }
        self
    }

    /// The parsed time window, if one is configured.
    pub fn window(&self) -> Result<Option<TimeDelta>, ValidationError> {
        self.since.as_deref().map(parse_duration).transpose()
    }

    /// Build the file classifier from the ignore patterns and rules.
    pub fn classifier(&self, clock: RunClock) -> Result<Classifier, ConfigError> {
        let mut classifier = Classifier::new();
        for pattern in &self.ignore_patterns {
            classifier = classifier.ignore(pattern)?;
        }
        for rule in &self.rules {
            let parser = PatternTimestampParser::new(
                rule.family,
                rule.line_pattern
                    .as_deref()
                    .unwrap_or(rule.family.default_pattern()),
                rule.time_format
                    .as_deref()
                    .unwrap_or(rule.family.default_format()),
                clock,
            )?;
            classifier = classifier.rule(TimestampRule::new(&rule.path_pattern, parser)?);
        }
        Ok(classifier)
    }
}

/// Where the loaded config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// `--config`
    Cli(PathBuf),
    /// `MG_CONFIG`
    Env(PathBuf),
    /// `$XDG_CONFIG_HOME/mg-attach/config.json`
    Xdg(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::Cli(p) | ConfigSource::Env(p) | ConfigSource::Xdg(p) => Some(p),
            ConfigSource::Defaults => None,
        }
    }
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: Config,
    pub source: ConfigSource,
}

/// Options for config loading.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Explicit config file (`--config`).
    pub config_path: Option<PathBuf>,
}

/// Decide which file, if any, to load.
///
/// An explicit or environment path must exist; the XDG default is used only
/// when present.
pub fn resolve_config_source(
    options: &ConfigOptions,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ConfigSource, ConfigError> {
    // 1. Explicit option
    if let Some(path) = &options.config_path {
        return require(path).map(ConfigSource::Cli);
    }

    // 2. Environment variable
    if let Some(path) = lookup(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return require(Path::new(&path)).map(ConfigSource::Env);
    }

    // 3. XDG config home
    let xdg_config = lookup("XDG_CONFIG_HOME")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });
    let default_path = xdg_config.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
    if default_path.is_file() {
        return Ok(ConfigSource::Xdg(default_path));
    }

    // 4. Built-in defaults
    Ok(ConfigSource::Defaults)
}

fn require(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Load a config from a specific file.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Resolve, load, override and validate the run configuration.
pub fn load_config(
    options: &ConfigOptions,
    overrides: &ConfigOverrides,
) -> Result<ResolvedConfig, ConfigError> {
    load_config_with(options, overrides, |key| std::env::var(key).ok())
}

/// [`load_config`] with an injectable environment lookup.
pub fn load_config_with(
    options: &ConfigOptions,
    overrides: &ConfigOverrides,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig, ConfigError> {
    let source = resolve_config_source(options, lookup)?;
    let config = match source.path() {
        Some(path) => {
            debug!(path = %path.display(), "Loading config file");
            load_config_file(path)?
        }
        None => Config::default(),
    }
    .with_overrides(overrides);

    validate_config(&config)?;
    Ok(ResolvedConfig { config, source })
}
