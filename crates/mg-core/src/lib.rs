//! mg-core library.
//!
//! Pipeline, configuration, logging and collector plumbing behind the
//! `mg-attach` binary. The trimming, packaging and upload logic live in
//! `mg-trim`, `mg-bundle` and `mg-upload`; this crate wires them together.

pub mod collect;
pub mod config;
pub mod exit_codes;
pub mod logging;
pub mod pipeline;

pub use collect::{CollectError, CollectOutput, Collector, COLLECTOR_LOG};
pub use config::{
    load_config, Config, ConfigError, ConfigOptions, ConfigOverrides, ConfigSource,
    ResolvedConfig,
};
pub use exit_codes::ExitCode;
pub use pipeline::{Pipeline, PipelineError, PipelineOptions, RunSummary};
