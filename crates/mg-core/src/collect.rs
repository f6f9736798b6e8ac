//! must-gather collector invocation.
//!
//! Runs `<program> adm must-gather --image=<image> --dest-dir=<dir>` to
//! completion. The collector's stdout is captured to `<dir>/must-gather.log`
//! so it travels inside the archive; stderr is inherited so progress stays
//! visible.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// File inside the collection directory that receives the collector's stdout.
pub const COLLECTOR_LOG: &str = "must-gather.log";

/// Errors that can occur while running the collector.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("command failed to spawn: {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("collector exited with non-zero status: {code}")]
    NonZeroExit { code: i32 },

    #[error("collector killed by signal: {signal}")]
    KilledBySignal { signal: i32 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result of a successful collection.
#[derive(Debug, Clone)]
pub struct CollectOutput {
    pub dest_dir: PathBuf,
    pub log_path: PathBuf,
    pub duration: Duration,
}

/// The collector command for one image.
#[derive(Debug, Clone)]
pub struct Collector {
    program: String,
    image: String,
}

impl Collector {
    pub fn new(program: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            image: image.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    /// Arguments passed to the program.
    pub fn args(&self, dest: &Path) -> Vec<String> {
        vec![
            "adm".to_string(),
            "must-gather".to_string(),
            format!("--image={}", self.image),
            format!("--dest-dir={}", dest.display()),
        ]
    }

    /// Replace `dest` with an empty directory.
    pub fn prepare_dest(dest: &Path) -> Result<(), CollectError> {
        let io_err = |source| CollectError::Io {
            path: dest.to_path_buf(),
            source,
        };
        if dest.exists() {
            warn!(dir = %dest.display(), "Removing existing collection directory");
            fs::remove_dir_all(dest).map_err(io_err)?;
        }
        fs::create_dir_all(dest).map_err(io_err)
    }

    /// Run the collector into `dest`, which must exist.
    pub fn run(&self, dest: &Path) -> Result<CollectOutput, CollectError> {
        let log_path = dest.join(COLLECTOR_LOG);
        let log = File::create(&log_path).map_err(|source| CollectError::Io {
            path: log_path.clone(),
            source,
        })?;

        let args = self.args(dest);
        info!(program = %self.program, image = %self.image, dir = %dest.display(), "Running must-gather");
        debug!(args = ?args, "Collector arguments");

        let start = Instant::now();
        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| {
                if source.kind() == io::ErrorKind::NotFound {
                    CollectError::CommandNotFound(self.program.clone())
                } else {
                    CollectError::SpawnFailed {
                        program: self.program.clone(),
                        source,
                    }
                }
            })?;
        let duration = start.elapsed();

        if !status.success() {
            if let Some(code) = status.code() {
                return Err(CollectError::NonZeroExit { code });
            }
            #[cfg(unix)]
            {
                use std::os::unix::process::ExitStatusExt;
                if let Some(signal) = status.signal() {
                    return Err(CollectError::KilledBySignal { signal });
                }
            }
            return Err(CollectError::NonZeroExit { code: -1 });
        }

        info!(duration_ms = duration.as_millis() as u64, "must-gather finished");
        Ok(CollectOutput {
            dest_dir: dest.to_path_buf(),
            log_path,
            duration,
        })
    }
}
