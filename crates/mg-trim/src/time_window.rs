//! Time-window trimming.
//!
//! The cutoff between dropped and retained lines is the partition point of
//! `age(line) > window`, found by binary search from the middle of the file.
//! Only the probed lines are parsed.
//!
//! The search trusts the log-file invariant that timestamps never decrease.
//! On out-of-order input it still terminates, but the cutoff it returns is
//! only guaranteed to sit where the predicate flips between two probed lines;
//! lines elsewhere may be on the wrong side of the window.

use crate::tree::TrimOutcome;
use crate::{BackupLedger, Result, RunClock, TimestampError, TimestampParser, TrimError};
use chrono::TimeDelta;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Locate the index of the first line inside the window.
///
/// Returns `0` when no line is old enough to drop and `lines.len()` when every
/// line is outside the window. On a parse failure, the error carries the index
/// of the offending line.
pub fn find_cutoff<P: TimestampParser + ?Sized>(
    lines: &[&str],
    parser: &P,
    clock: RunClock,
    window: TimeDelta,
) -> std::result::Result<usize, (usize, TimestampError)> {
    let now = clock.now();
    let is_outside = |idx: usize| -> std::result::Result<bool, (usize, TimestampError)> {
        let ts = parser.parse(lines[idx]).map_err(|e| (idx, e))?;
        Ok(now - ts > window)
    };

    let mut lo = 0;
    let mut hi = lines.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if is_outside(mid)? {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}

/// Keeps the trailing lines whose timestamps are within `window` of the run clock.
pub struct TimeWindowTrimmer<'p, P: TimestampParser + ?Sized> {
    parser: &'p P,
    clock: RunClock,
    window: TimeDelta,
}

impl<'p, P: TimestampParser + ?Sized> TimeWindowTrimmer<'p, P> {
    pub fn new(parser: &'p P, clock: RunClock, window: TimeDelta) -> Self {
        Self {
            parser,
            clock,
            window,
        }
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    /// Compute the trimmed content and the cutoff index.
    ///
    /// Returns `Ok(None)` when the cutoff is the first line.
    pub fn apply(
        &self,
        content: &str,
    ) -> std::result::Result<Option<(String, usize)>, (usize, TimestampError)> {
        let lines: Vec<&str> = content.lines().collect();
        let cutoff = find_cutoff(&lines, self.parser, self.clock, self.window)?;
        if cutoff == 0 {
            return Ok(None);
        }

        let mut out = String::new();
        for line in &lines[cutoff..] {
            out.push_str(line);
            out.push('\n');
        }
        Ok(Some((out, cutoff)))
    }

    /// Trim a file in place, backing it up first when it changes.
    pub fn trim(&self, path: &Path, ledger: &mut BackupLedger) -> Result<TrimOutcome> {
        let content = fs::read_to_string(path).map_err(|e| TrimError::io(path, e))?;
        let original_lines = content.lines().count();

        let applied = self
            .apply(&content)
            .map_err(|(line, source)| TrimError::Timestamp {
                path: path.to_path_buf(),
                line,
                source,
            })?;

        let Some((trimmed, cutoff)) = applied else {
            debug!(path = %path.display(), lines = original_lines, "Nothing older than window");
            return Ok(TrimOutcome::Unchanged {
                lines: original_lines,
            });
        };

        ledger.backup(path)?;
        fs::write(path, trimmed).map_err(|e| TrimError::io(path, e))?;

        Ok(TrimOutcome::Trimmed {
            original_lines,
            kept_lines: original_lines - cutoff,
        })
    }
}
