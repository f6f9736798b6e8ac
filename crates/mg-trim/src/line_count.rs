//! Line-count trimming.

use crate::tree::TrimOutcome;
use crate::{BackupLedger, Result, TrimError};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Default maximum number of lines kept per file.
pub const DEFAULT_MAX_LINES: usize = 100_000;

/// Marker written as the first line of a trimmed file.
pub fn marker_line(max_lines: usize) -> String {
    format!("File trimmed to last {} lines", max_lines)
}

/// Keeps the last `max_lines` lines of files that exceed the cap.
#[derive(Debug, Clone, Copy)]
pub struct LineCountTrimmer {
    max_lines: usize,
}

impl LineCountTrimmer {
    pub fn new(max_lines: usize) -> Self {
        Self { max_lines }
    }

    pub fn max_lines(&self) -> usize {
        self.max_lines
    }

    /// Compute the trimmed content, or `None` when the content is within the cap.
    ///
    /// Line endings in the result are normalized to `\n`.
    pub fn apply(&self, content: &str) -> Option<String> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() <= self.max_lines {
            return None;
        }

        let kept = &lines[lines.len() - self.max_lines..];
        let mut out = String::with_capacity(content.len().min(kept.len() * 128));
        out.push_str(&marker_line(self.max_lines));
        out.push('\n');
        for line in kept {
            out.push_str(line);
            out.push('\n');
        }
        Some(out)
    }

    /// Trim a file in place, backing it up first when it changes.
    pub fn trim(&self, path: &Path, ledger: &mut BackupLedger) -> Result<TrimOutcome> {
        let content = fs::read_to_string(path).map_err(|e| TrimError::io(path, e))?;
        let original_lines = content.lines().count();

        let Some(trimmed) = self.apply(&content) else {
            debug!(path = %path.display(), lines = original_lines, "Within line cap");
            return Ok(TrimOutcome::Unchanged {
                lines: original_lines,
            });
        };

        ledger.backup(path)?;
        fs::write(path, trimmed).map_err(|e| TrimError::io(path, e))?;

        Ok(TrimOutcome::Trimmed {
            original_lines,
            kept_lines: self.max_lines,
        })
    }
}

impl Default for LineCountTrimmer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINES)
    }
}
