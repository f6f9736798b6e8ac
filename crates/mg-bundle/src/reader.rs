//! Bundle reader for inspecting written archives.

use crate::Result;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// One entry read back from a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive, `/`-separated.
    pub path: String,
    pub is_dir: bool,
    /// File content; empty for directories.
    pub data: Vec<u8>,
}

impl ArchiveEntry {
    /// Last path component.
    pub fn basename(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}

/// Read every entry of a `.tar.gz` bundle in archive order.
pub fn read_entries(path: &Path) -> Result<Vec<ArchiveEntry>> {
    let file = File::open(path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));

    let mut out = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let is_dir = entry.header().entry_type().is_dir();
        let name = entry.path()?.to_string_lossy().into_owned();
        let mut data = Vec::new();
        if !is_dir {
            entry.read_to_end(&mut data)?;
        }
        out.push(ArchiveEntry {
            path: name.trim_end_matches('/').to_string(),
            is_dir,
            data,
        });
    }

    debug!(path = %path.display(), entries = out.len(), "Bundle read");
    Ok(out)
}
