//! Bundle writer for creating `.tar.gz` files.

use crate::{BundleError, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use mg_trim::{walk_tree, BackupLedger, RunClock};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Time-stamped archive file name for a run.
pub fn archive_name(base: &str, clock: RunClock) -> String {
    format!("{}-{}.tar.gz", base, clock.now().format("%Y-%m-%d_%H-%M-%S"))
}

/// What was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    /// Entries written, directories included.
    pub entries: usize,
    pub files: usize,
    pub uncompressed_bytes: u64,
    pub compressed_bytes: u64,
    /// Files whose originals were put back after archiving.
    pub restored: usize,
}

/// Builder for a bundle of one diagnostic tree.
pub struct ArchiveBuilder {
    root: PathBuf,
    arc_root: String,
}

impl ArchiveBuilder {
    /// Archive the tree at `root` under its own directory name.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let arc_root = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "must-gather".to_string());
        Self { root, arc_root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write the archive to `dest`, skipping paths `exclude` rejects.
    ///
    /// A partially written `dest` is removed on failure.
    pub fn write(&self, dest: &Path, exclude: &dyn Fn(&Path) -> bool) -> Result<ArchiveSummary> {
        if !self.root.is_dir() {
            return Err(BundleError::NotADirectory(self.root.clone()));
        }

        let result = self.write_inner(dest, exclude);
        if result.is_err() && dest.exists() {
            if let Err(e) = fs::remove_file(dest) {
                warn!(path = %dest.display(), error = %e, "Could not remove partial archive");
            }
        }
        result
    }

    fn write_inner(&self, dest: &Path, exclude: &dyn Fn(&Path) -> bool) -> Result<ArchiveSummary> {
        let entries = walk_tree(&self.root, exclude)?;
        if entries.is_empty() {
            return Err(BundleError::EmptyBundle);
        }

        let file = File::create(dest)?;
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        let mut tar = tar::Builder::new(encoder);
        tar.follow_symlinks(false);

        tar.append_dir(&self.arc_root, &self.root)?;
        let mut files = 0;
        let mut uncompressed_bytes = 0;
        for entry in &entries {
            let name = format!("{}/{}", self.arc_root, entry.relative);
            if entry.is_dir {
                tar.append_dir(&name, &entry.path)?;
            } else {
                tar.append_path_with_name(&entry.path, &name)?;
                files += 1;
                uncompressed_bytes += fs::symlink_metadata(&entry.path)?.len();
            }
            debug!(path = %name, "Added entry to bundle");
        }

        let encoder = tar.into_inner()?;
        let mut writer = encoder.finish()?;
        writer.flush()?;
        drop(writer);

        let compressed_bytes = fs::metadata(dest)?.len();
        let summary = ArchiveSummary {
            path: dest.to_path_buf(),
            entries: entries.len() + 1,
            files,
            uncompressed_bytes,
            compressed_bytes,
            restored: 0,
        };

        info!(
            path = %dest.display(),
            files,
            uncompressed_bytes,
            compressed_bytes,
            "Bundle written"
        );
        Ok(summary)
    }

    /// Write the archive excluding the ledger's backups, then restore them.
    ///
    /// Restoration runs whether or not the archive was written. An archive
    /// failure takes precedence over a restore failure in the returned error;
    /// the restore failure is still logged.
    pub fn write_and_restore(
        &self,
        dest: &Path,
        ledger: &mut BackupLedger,
    ) -> Result<ArchiveSummary> {
        let built = {
            let owned = |p: &Path| ledger.owns(p);
            self.write(dest, &owned)
        };
        let restored = ledger.restore_all();

        match (built, restored) {
            (Ok(mut summary), Ok(report)) => {
                summary.restored = report.restored.len();
                Ok(summary)
            }
            (Ok(_), Err(e)) => Err(BundleError::Restore(e)),
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(restore_err)) => {
                error!(error = %restore_err, "Restore failed after archive failure");
                Err(e)
            }
        }
    }
}
