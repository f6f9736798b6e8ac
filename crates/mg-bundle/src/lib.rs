//! Archive builder for trimmed must-gather trees.
//!
//! # Bundle Format
//!
//! A bundle is a gzip-compressed tar archive named
//! `<base>-<YYYY-MM-DD_HH-MM-SS>.tar.gz` after the run clock. It contains the
//! collection directory as its single top-level entry, with every file and
//! directory beneath it except those owned by the backup ledger.
//!
//! Building is one half of a two-phase discipline: the trim phase stages
//! originals in a [`mg_trim::BackupLedger`], the archive captures the trimmed
//! content, and [`ArchiveBuilder::write_and_restore`] then puts the originals
//! back whether or not the archive could be written.
//!
//! # Example
//!
//! ```no_run
//! use mg_bundle::{archive_name, ArchiveBuilder};
//! use mg_trim::{BackupLedger, RunClock};
//! use std::path::Path;
//!
//! let clock = RunClock::capture();
//! let root = Path::new("gather-files");
//! let mut ledger = BackupLedger::new(root);
//! // ... trim files, staging originals in the ledger ...
//!
//! let dest = Path::new(".").join(archive_name("must-gather", clock));
//! let summary = ArchiveBuilder::new(root)
//!     .write_and_restore(&dest, &mut ledger)
//!     .unwrap();
//! println!("{} entries, {} bytes", summary.entries, summary.compressed_bytes);
//! ```

pub mod builder;
pub mod error;
pub mod reader;

pub use builder::{archive_name, ArchiveBuilder, ArchiveSummary};
pub use error::{BundleError, Result};
pub use reader::{read_entries, ArchiveEntry};
