//! Trimming of must-gather diagnostic trees.
//!
//! A must-gather run can produce log files far larger than a Bugzilla
//! attachment allows. This crate reduces them before packaging:
//!
//! - [`LineCountTrimmer`]: keeps the last N lines behind a marker line
//! - [`TimeWindowTrimmer`]: keeps the trailing lines whose timestamp is within
//!   a window of the captured run time
//! - [`BackupLedger`]: stages the original bytes of every file before it is
//!   mutated and restores them once the archive has been written
//! - [`TreeTrimmer`]: walks a tree, classifies each file and applies the
//!   matching trimmer, containing failures per file
//!
//! # Example
//!
//! ```no_run
//! use mg_trim::{BackupLedger, Classifier, RunClock, TreeTrimmer, TrimPolicy};
//! use std::path::Path;
//!
//! let clock = RunClock::capture();
//! let classifier = Classifier::with_defaults(clock).unwrap();
//! let root = Path::new("gather-files");
//! let mut ledger = BackupLedger::new(root);
//!
//! let trimmer = TreeTrimmer::new(&classifier, TrimPolicy::default(), clock);
//! let report = trimmer.trim_tree(root, &mut ledger).unwrap();
//! println!("trimmed {} files", report.trimmed.len());
//!
//! // ... build the archive ...
//! ledger.restore_all().unwrap();
//! ```

pub mod backup;
pub mod clock;
pub mod error;
pub mod line_count;
pub mod time_window;
pub mod timestamp;
pub mod tree;

pub use backup::{BackupLedger, RestoreReport};
pub use clock::RunClock;
pub use error::{Result, TimestampError, TrimError};
pub use line_count::{LineCountTrimmer, DEFAULT_MAX_LINES};
pub use time_window::{find_cutoff, TimeWindowTrimmer};
pub use timestamp::{PatternTimestampParser, TimestampFamily, TimestampParser};
pub use tree::{
    walk_tree, Classifier, FileClass, FileFailure, FileTrim, LogFile, TimestampRule, TreeEntry,
    TreeTrimmer, TrimOutcome, TrimPolicy, TrimReport,
};
