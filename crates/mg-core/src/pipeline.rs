//! End-to-end run: pre-flight check, collection, trimming, packaging, upload.
//!
//! Stages run strictly in order and each one logs inside a `stage` span. Any
//! trimmed file is restored before [`Pipeline::run`] returns, whichever stage
//! fails.

use crate::collect::{CollectError, Collector};
use crate::config::{validate_dest_dir, Config, ConfigError};
use crate::exit_codes::ExitCode;
use crate::logging::{event_names, Stage};
use mg_bundle::{archive_name, ArchiveBuilder, ArchiveSummary, BundleError};
use mg_trim::{BackupLedger, RunClock, TreeTrimmer, TrimError, TrimPolicy, TrimReport};
use mg_upload::{
    encode_payload, verify_bug, AuthMode, BugTracker, CollectionSummary, Prompter, UploadConfig,
    UploadError, UploadOutcome, UploadSession,
};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, info_span};

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("must-gather failed: {0}")]
    Collect(#[from] CollectError),

    #[error("trimming failed: {0}")]
    Trim(#[from] TrimError),

    #[error("archive failed: {0}")]
    Bundle(#[from] BundleError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// The process exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            PipelineError::Config(_) => ExitCode::ConfigError,
            PipelineError::Collect(_) => ExitCode::CollectError,
            PipelineError::Trim(_) | PipelineError::Io { .. } => ExitCode::IoError,
            PipelineError::Bundle(_) => ExitCode::ArchiveError,
            PipelineError::NotADirectory(_) => ExitCode::ArgsError,
            PipelineError::Upload(e) => match e {
                UploadError::BugNotFound { .. } => ExitCode::BugNotFound,
                UploadError::Rejected { .. } => ExitCode::Rejected,
                UploadError::Transport(_) | UploadError::InvalidResponse { .. } => {
                    ExitCode::NetworkError
                }
                UploadError::Prompt(_) => ExitCode::IoError,
            },
        }
    }
}

/// What a run should do.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub bug_id: u64,
    pub config: Config,
    /// Non-interactive upload when set.
    pub api_key: Option<String>,
    /// Existing tree to package instead of running the collector.
    pub from_dir: Option<PathBuf>,
    /// Stop once the archive is written.
    pub no_upload: bool,
    /// Directory receiving the collection and the archive.
    pub work_dir: PathBuf,
}

impl PipelineOptions {
    pub fn new(bug_id: u64, config: Config) -> Self {
        Self {
            bug_id,
            config,
            api_key: None,
            from_dir: None,
            no_upload: false,
            work_dir: PathBuf::from("."),
        }
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key;
        self
    }

    pub fn with_from_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.from_dir = dir;
        self
    }

    pub fn with_no_upload(mut self, no_upload: bool) -> Self {
        self.no_upload = no_upload;
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    fn tree_root(&self) -> PathBuf {
        match &self.from_dir {
            Some(dir) => dir.clone(),
            None => self.work_dir.join(&self.config.dest_dir),
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub archive: ArchiveSummary,
    pub trim: TrimReport,
    /// `None` when the upload was skipped.
    pub upload: Option<UploadOutcome>,
}

impl RunSummary {
    pub fn exit_code(&self) -> ExitCode {
        match self.upload {
            Some(UploadOutcome::Aborted { .. }) => ExitCode::Aborted,
            _ => ExitCode::Ok,
        }
    }
}

/// One run over injected tracker and prompter.
pub struct Pipeline<'a> {
    options: PipelineOptions,
    clock: RunClock,
    tracker: &'a dyn BugTracker,
    prompter: &'a mut dyn Prompter,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        options: PipelineOptions,
        clock: RunClock,
        tracker: &'a dyn BugTracker,
        prompter: &'a mut dyn Prompter,
    ) -> Self {
        Self {
            options,
            clock,
            tracker,
            prompter,
        }
    }

    pub fn run(self) -> Result<RunSummary, PipelineError> {
        let Pipeline {
            options,
            clock,
            tracker,
            prompter,
        } = self;
        let config = &options.config;

        if !options.no_upload {
            let _stage = info_span!("stage", stage = %Stage::Preflight).entered();
            verify_bug(tracker, options.bug_id, options.api_key.as_deref())?;
            info!(event = event_names::BUG_CONFIRMED, bug_id = options.bug_id, "Bug confirmed");
        }

        let root = options.tree_root();
        {
            let _stage = info_span!("stage", stage = %Stage::Collect).entered();
            if options.from_dir.is_some() {
                if !root.is_dir() {
                    return Err(PipelineError::NotADirectory(root));
                }
                info!(event = event_names::COLLECT_SKIPPED, dir = %root.display(), "Using existing collection");
            } else {
                validate_dest_dir(&config.dest_dir).map_err(ConfigError::from)?;
                info!(event = event_names::COLLECT_STARTED, image = %config.image, "Collecting");
                Collector::prepare_dest(&root)?;
                let output = Collector::new(&config.collector, &config.image).run(&root)?;
                info!(
                    event = event_names::COLLECT_FINISHED,
                    dir = %output.dest_dir.display(),
                    log = %output.log_path.display(),
                    duration_ms = output.duration.as_millis() as u64,
                    "Collection finished"
                );
            }
        }

        let mut ledger = BackupLedger::new(&root);
        let trim = {
            let _stage = info_span!("stage", stage = %Stage::Trim).entered();
            let classifier = config.classifier(clock)?;
            let window = config.window().map_err(ConfigError::from)?;
            let policy = TrimPolicy {
                max_lines: config.max_lines,
                window,
            };
            let report = TreeTrimmer::new(&classifier, policy, clock).trim_tree(&root, &mut ledger)?;
            info!(
                event = event_names::TRIM_FINISHED,
                files = report.files_seen,
                trimmed = report.trimmed.len(),
                failed = report.failures.len(),
                "Trim pass finished"
            );
            report
        };

        let archive = {
            let _stage = info_span!("stage", stage = %Stage::Bundle).entered();
            let dest = options
                .work_dir
                .join(archive_name(&config.archive_base, clock));
            let summary = ArchiveBuilder::new(&root).write_and_restore(&dest, &mut ledger)?;
            info!(
                event = event_names::BUNDLE_WRITTEN,
                path = %summary.path.display(),
                bytes = summary.compressed_bytes,
                restored = summary.restored,
                "Archive created"
            );
            summary
        };

        if options.no_upload {
            info!(event = event_names::UPLOAD_SKIPPED, "Upload disabled");
            return Ok(RunSummary {
                archive,
                trim,
                upload: None,
            });
        }

        let _stage = info_span!("stage", stage = %Stage::Upload).entered();
        let upload = upload_archive(&options, &archive.path, &trim, tracker, prompter)?;
        info!(event = event_names::UPLOAD_FINISHED, outcome = ?upload, "Upload finished");
        Ok(RunSummary {
            archive,
            trim,
            upload: Some(upload),
        })
    }
}

fn upload_archive(
    options: &PipelineOptions,
    archive: &Path,
    trim: &TrimReport,
    tracker: &dyn BugTracker,
    prompter: &mut dyn Prompter,
) -> Result<UploadOutcome, PipelineError> {
    let bytes = fs::read(archive).map_err(|source| PipelineError::Io {
        path: archive.to_path_buf(),
        source,
    })?;
    let payload = encode_payload(&bytes);
    drop(bytes);

    let summary = CollectionSummary {
        image: options
            .from_dir
            .is_none()
            .then(|| options.config.image.clone()),
        max_lines: options.config.max_lines,
        since: options.config.since.clone(),
        files_seen: trim.files_seen,
        trimmed_files: trim.trimmed.len(),
    };
    let file_name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive.display().to_string());
    let upload = UploadConfig {
        bug_id: options.bug_id,
        file_name,
        comment: summary.to_comment(),
        mode: match &options.api_key {
            Some(key) => AuthMode::ApiKey(key.clone()),
            None => AuthMode::Interactive,
        },
    };

    info!(
        event = event_names::UPLOAD_STARTED,
        url = %options.config.bugzilla_url,
        bytes = payload.len(),
        "Sending archive"
    );
    let outcome = UploadSession::new(tracker, prompter).run(&upload, &payload)?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_error_exit_codes() {
        let cases = [
            (
                UploadError::BugNotFound {
                    bug_id: 1,
                    message: "x".into(),
                },
                ExitCode::BugNotFound,
            ),
            (
                UploadError::Rejected {
                    code: Some(300),
                    message: "x".into(),
                },
                ExitCode::Rejected,
            ),
            (UploadError::Transport("x".into()), ExitCode::NetworkError),
            (
                UploadError::InvalidResponse {
                    status: 502,
                    message: "x".into(),
                },
                ExitCode::NetworkError,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(PipelineError::from(err).exit_code(), code);
        }
    }

    #[test]
    fn test_other_exit_codes() {
        assert_eq!(
            PipelineError::Collect(CollectError::NonZeroExit { code: 1 }).exit_code(),
            ExitCode::CollectError
        );
        assert_eq!(
            PipelineError::Bundle(BundleError::EmptyBundle).exit_code(),
            ExitCode::ArchiveError
        );
        assert_eq!(
            PipelineError::NotADirectory(PathBuf::from("x")).exit_code(),
            ExitCode::ArgsError
        );
    }

    #[test]
    fn test_tree_root() {
        let options = PipelineOptions::new(1, Config::default()).with_work_dir("/work");
        assert_eq!(options.tree_root(), PathBuf::from("/work/gather-files"));
        let options = options.with_from_dir(Some(PathBuf::from("/data/mg")));
        assert_eq!(options.tree_root(), PathBuf::from("/data/mg"));
    }

    #[test]
    fn test_summary_exit_code() {
        let archive = ArchiveSummary {
            path: PathBuf::from("a.tar.gz"),
            entries: 1,
            files: 0,
            uncompressed_bytes: 0,
            compressed_bytes: 0,
            restored: 0,
        };
        let aborted = RunSummary {
            archive: archive.clone(),
            trim: TrimReport::default(),
            upload: Some(UploadOutcome::Aborted {
                reason: mg_upload::AbortReason::BlankBugId,
                submissions: 1,
            }),
        };
        assert_eq!(aborted.exit_code(), ExitCode::Aborted);
        let skipped = RunSummary {
            archive,
            trim: TrimReport::default(),
            upload: None,
        };
        assert_eq!(skipped.exit_code(), ExitCode::Ok);
    }

    #[test]
    fn test_unsafe_dest_dir_never_removes_work_dir() {
        let work = tempfile::TempDir::new().unwrap();
        let precious = work.path().join("precious.txt");
        fs::write(&precious, "keep me").unwrap();

        for dest_dir in ["", ".", ".."] {
            let config = Config {
                dest_dir: PathBuf::from(dest_dir),
                collector: "/bin/true".to_string(),
                ..Config::default()
            };
            let options = PipelineOptions::new(1, config)
                .with_no_upload(true)
                .with_work_dir(work.path());
            let client = mg_upload::BugzillaClient::default();
            let mut prompter = mg_upload::TerminalPrompter::new();
            let err = Pipeline::new(options, RunClock::capture(), &client, &mut prompter)
                .run()
                .unwrap_err();

            assert_eq!(err.exit_code(), ExitCode::ConfigError, "{dest_dir:?}");
            assert_eq!(fs::read_to_string(&precious).unwrap(), "keep me");
        }
    }
}
