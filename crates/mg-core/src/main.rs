//! mg-attach - collect must-gather output and attach it to a Bugzilla bug.
//!
//! The run, in order:
//! - confirm the bug exists (skipped with `--no-upload`)
//! - run `oc adm must-gather` into a fresh directory (skipped with `--from-dir`)
//! - trim oversized logs by line count or time window
//! - write a time-stamped `.tar.gz` and restore the trimmed originals
//! - upload the archive, re-prompting on bad credentials or bug ids

use clap::{Args, Parser};
use mg_core::config::{load_config, ConfigOptions, ConfigOverrides};
use mg_core::exit_codes::ExitCode;
use mg_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogFormat, LogLevel, Stage,
};
use mg_core::pipeline::{Pipeline, PipelineOptions};
use mg_trim::RunClock;
use mg_upload::{BugzillaClient, TerminalPrompter, UploadOutcome};
use std::path::PathBuf;
use tracing::{debug, error, info, info_span, warn};

/// Sends the result of must-gather to Bugzilla.
#[derive(Parser, Debug)]
#[command(name = "mg-attach")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The ID of the bug in Bugzilla
    #[arg(value_name = "BUG_ID", value_parser = clap::value_parser!(u64).range(1..))]
    bug_id: u64,

    /// The image to use for must-gather
    #[arg(long)]
    image: Option<String>,

    /// API key instead of username and password (disables retry prompts)
    #[arg(long, env = "BUGZILLA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Keep only the last DURATION of timestamped logs (e.g. 90m, 6h, 2d)
    #[arg(long, value_name = "DURATION")]
    since: Option<String>,

    /// Maximum number of lines kept per file
    #[arg(long, value_name = "N")]
    max_lines: Option<usize>,

    /// Directory the collector writes into
    #[arg(long, value_name = "DIR")]
    dest_dir: Option<PathBuf>,

    /// Package an existing collection instead of running must-gather
    #[arg(long, value_name = "DIR", conflicts_with_all = ["dest_dir", "image"])]
    from_dir: Option<PathBuf>,

    /// Stop after the archive is written
    #[arg(long)]
    no_upload: bool,

    /// Bugzilla base URL
    #[arg(long, value_name = "URL")]
    bugzilla_url: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(flatten)]
    log: LogOpts,
}

/// Logging options
#[derive(Args, Debug)]
struct LogOpts {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log output format
    #[arg(long, value_name = "FORMAT", value_parser = ["human", "jsonl"])]
    log_format: Option<String>,
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::Ok
                }
                _ => ExitCode::ArgsError,
            };
            let _ = e.print();
            std::process::exit(code.as_i32());
        }
    };

    let log_level = if cli.log.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.log.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    let log_format = cli
        .log
        .log_format
        .as_deref()
        .and_then(|f| f.parse::<LogFormat>().ok());
    init_logging(&LogConfig::from_env(log_level, log_format));

    let exit_code = run(cli);
    std::process::exit(exit_code.as_i32());
}

fn run(cli: Cli) -> ExitCode {
    let run_id = generate_run_id();
    let run_span = info_span!("run", run_id = %run_id);
    let _run = run_span.enter();
    info!(
        event = event_names::RUN_STARTED,
        bug_id = cli.bug_id,
        version = env!("CARGO_PKG_VERSION"),
        "Starting mg-attach"
    );

    let init = info_span!("stage", stage = %Stage::Init).entered();
    let overrides = ConfigOverrides {
        bugzilla_url: cli.bugzilla_url.clone(),
        image: cli.image.clone(),
        dest_dir: cli.dest_dir.clone(),
        max_lines: cli.max_lines,
        since: cli.since.clone(),
    };
    let options = ConfigOptions {
        config_path: cli.config.clone(),
    };
    let resolved = match load_config(&options, &overrides) {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("mg-attach: {}", e);
            return ExitCode::ConfigError;
        }
    };
    match resolved.source.path() {
        Some(path) => info!(event = event_names::CONFIG_LOADED, path = %path.display(), "Config loaded"),
        None => debug!(event = event_names::CONFIG_DEFAULT_USED, "Using default config"),
    }

    let work_dir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            error!(
                event = event_names::INTERNAL_ERROR,
                error = %e,
                "Cannot determine working directory"
            );
            eprintln!("mg-attach: cannot determine working directory: {}", e);
            return ExitCode::InternalError;
        }
    };
    drop(init);

    let clock = RunClock::capture();
    let client = BugzillaClient::new(resolved.config.bugzilla_url.clone());
    let mut prompter = TerminalPrompter::new();
    let options = PipelineOptions::new(cli.bug_id, resolved.config)
        .with_api_key(cli.api_key)
        .with_from_dir(cli.from_dir)
        .with_no_upload(cli.no_upload)
        .with_work_dir(work_dir);

    match Pipeline::new(options, clock, &client, &mut prompter).run() {
        Ok(summary) => {
            println!("{}", summary.archive.path.display());
            match &summary.upload {
                Some(UploadOutcome::Attached { bug_id, .. }) => println!("{}", bug_id),
                Some(UploadOutcome::Aborted { reason, .. }) => {
                    warn!(reason = %reason, "Upload aborted; archive kept")
                }
                None => {}
            }
            let code = summary.exit_code();
            info!(event = event_names::RUN_FINISHED, exit = %code, "Done");
            code
        }
        Err(e) => {
            let code = e.exit_code();
            if code.is_internal_error() {
                error!(event = event_names::RUN_FINISHED, exit = %code, error = %e, "Run failed");
            } else {
                warn!(event = event_names::RUN_FINISHED, exit = %code, error = %e, "Run failed");
            }
            eprintln!("mg-attach: {}", e);
            code
        }
    }
}
