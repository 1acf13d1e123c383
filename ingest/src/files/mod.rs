use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

pub mod directory;
mod discovery;
mod filter;
mod watcher;

pub use discovery::{checksum_file, discover, has_extension};
pub use filter::{filter_by_date, limit, sort_by_modified_desc};
pub use watcher::{ReplayWatcher, WatchGuard, SETTLE_DELAY};

/// A replay file found on disk, fingerprinted but not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// Lower-case hex SHA-256 of the file contents
    pub checksum: String,
}

impl FileCandidate {
    /// Stat and fingerprint `path`. Reads the whole file.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        let modified: DateTime<Utc> = metadata.modified()?.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(FileCandidate {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            modified,
            checksum: checksum_file(path)?,
        })
    }

    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}
