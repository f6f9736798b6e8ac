//! Backup staging for files mutated during a run.
//!
//! The ledger owns a staging directory created inside the tree root and
//! records, for every trimmed file, where its original bytes were staged.
//! Ownership is explicit: restoring and archive exclusion consult the ledger,
//! never a file-name convention, so user content cannot collide with backups.
//!
//! Every staged copy is put back by [`BackupLedger::restore_all`]. If the
//! ledger is dropped with entries still pending, the drop handler restores
//! them so that no exit path leaves the tree trimmed.

use crate::{Result, TrimError};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

/// Prefix of the staging directory created inside the tree root.
pub const STAGING_PREFIX: &str = ".mg-backup-";

/// Summary of a restore pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Files whose original content was put back.
    pub restored: Vec<PathBuf>,
}

/// Original-path to staged-copy record for one run.
#[derive(Debug)]
pub struct BackupLedger {
    root: PathBuf,
    staging: Option<TempDir>,
    entries: BTreeMap<PathBuf, PathBuf>,
    next_id: usize,
}

impl BackupLedger {
    /// Create an empty ledger for the tree at `root`.
    ///
    /// The staging directory is created on the first backup.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            staging: None,
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Root of the tree this ledger stages backups for.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The staging directory, if any backup has been made.
    pub fn staging_dir(&self) -> Option<&Path> {
        self.staging.as_ref().map(TempDir::path)
    }

    /// Number of pending backups.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `original` has a pending backup.
    pub fn contains(&self, original: &Path) -> bool {
        self.entries.contains_key(original)
    }

    /// Whether `path` is, or lies inside, the ledger's staging directory.
    pub fn owns(&self, path: &Path) -> bool {
        self.staging_dir()
            .is_some_and(|staging| path.starts_with(staging))
    }

    /// Stage a byte-for-byte copy of `original`.
    ///
    /// A file already backed up in this run keeps its first copy, so the
    /// restored content is always the pre-run content.
    pub fn backup(&mut self, original: &Path) -> Result<()> {
        if self.entries.contains_key(original) {
            debug!(path = %original.display(), "Backup already staged");
            return Ok(());
        }

        let file_type = fs::symlink_metadata(original)
            .map_err(|e| TrimError::io(original, e))?
            .file_type();
        if !file_type.is_file() {
            return Err(TrimError::NotRegularFile(original.to_path_buf()));
        }

        let staging = self.ensure_staging()?;
        let staged = staging.join(format!("{:06}", self.next_id));
        fs::copy(original, &staged).map_err(|e| TrimError::io(original, e))?;

        self.next_id += 1;
        self.entries.insert(original.to_path_buf(), staged);
        debug!(path = %original.display(), "Backup staged");
        Ok(())
    }

    fn ensure_staging(&mut self) -> Result<PathBuf> {
        if let Some(dir) = &self.staging {
            return Ok(dir.path().to_path_buf());
        }
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|e| TrimError::io(&self.root, e))?;
        let path = dir.path().to_path_buf();
        self.staging = Some(dir);
        Ok(path)
    }

    /// Put every staged original back in place and remove the staging area.
    ///
    /// All entries are attempted even if some fail. Failed entries stay in the
    /// ledger and the staging directory is kept on disk so their originals are
    /// not lost.
    pub fn restore_all(&mut self) -> Result<RestoreReport> {
        let mut report = RestoreReport::default();
        let mut failed = Vec::new();

        let entries = std::mem::take(&mut self.entries);
        for (original, staged) in entries {
            match restore_one(&staged, &original) {
                Ok(()) => report.restored.push(original),
                Err(e) => {
                    error!(path = %original.display(), error = %e, "Restore failed");
                    failed.push((original, staged));
                }
            }
        }

        if failed.is_empty() {
            if let Some(dir) = self.staging.take() {
                let path = dir.path().to_path_buf();
                if let Err(e) = dir.close() {
                    warn!(dir = %path.display(), error = %e, "Could not remove backup staging");
                }
            }
            if !report.restored.is_empty() {
                info!(files = report.restored.len(), "Originals restored");
            }
            return Ok(report);
        }

        let staging = match self.staging.take() {
            Some(dir) => dir.keep(),
            None => self.root.clone(),
        };
        let failed_paths = failed.iter().map(|(p, _)| p.clone()).collect();
        self.entries = failed.into_iter().collect();
        Err(TrimError::RestoreFailed {
            failed: failed_paths,
            staging,
        })
    }
}

fn restore_one(staged: &Path, original: &Path) -> std::io::Result<()> {
    if fs::rename(staged, original).is_ok() {
        return Ok(());
    }
    fs::copy(staged, original)?;
    fs::remove_file(staged)
}

impl Drop for BackupLedger {
    fn drop(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        warn!(
            pending = self.entries.len(),
            "Ledger dropped with pending backups, restoring"
        );
        if let Err(e) = self.restore_all() {
            error!(error = %e, "Restore on drop failed");
        }
    }
}
