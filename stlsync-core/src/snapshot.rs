/// Directory snapshots keyed by (name, created, modified).
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use tracing::trace;

use crate::error::SyncError;

/// One regular file as seen by a single poll.
///
/// The name is kept as the raw OS string so names that are not valid
/// UTF-8 stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRecord {
    pub name: OsString,
    pub created_at: SystemTime,
    pub modified_at: SystemTime,
}

impl FileRecord {
    pub fn new(name: impl Into<OsString>, created_at: SystemTime, modified_at: SystemTime) -> Self {
        Self {
            name: name.into(),
            created_at,
            modified_at,
        }
    }

    fn from_metadata(name: OsString, metadata: &Metadata) -> Self {
        let modified_at = metadata.modified().unwrap_or(UNIX_EPOCH);
        Self {
            name,
            created_at: created_time(metadata).unwrap_or(modified_at),
            modified_at,
        }
    }
}

/// Status-change time on Unix, birth time elsewhere.
#[cfg(unix)]
fn created_time(metadata: &Metadata) -> Option<SystemTime> {
    let secs = u64::try_from(metadata.ctime()).ok()?;
    let nanos = u32::try_from(metadata.ctime_nsec()).ok()?;
    UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn created_time(metadata: &Metadata) -> Option<SystemTime> {
    metadata.created().ok()
}

/// A regular file found by [`list_files`].
#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub name: OsString,
    pub path: PathBuf,
    pub metadata: Metadata,
}

/// List the regular files directly inside `dir`, sorted by name.
///
/// Subdirectories and other non-regular entries are skipped, as are entries
/// that disappear between listing and stat.
pub fn list_files(dir: &Path) -> Result<Vec<DirEntryInfo>, SyncError> {
    let reader = fs::read_dir(dir).map_err(|e| SyncError::unavailable(dir, e))?;

    let mut files = Vec::new();
    for entry in reader {
        let entry = entry.map_err(|e| SyncError::unavailable(dir, e))?;
        let path = entry.path();
        // Follows symlinks so a linked file counts as a file.
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                trace!(path = %path.display(), error = %e, "entry vanished during listing");
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        files.push(DirEntryInfo {
            name: entry.file_name(),
            path,
            metadata,
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Unordered set of file records for one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: HashSet<FileRecord>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every regular file currently in `dir`.
    pub fn capture(dir: &Path) -> Result<Self, SyncError> {
        let records = list_files(dir)?
            .into_iter()
            .map(|f| FileRecord::from_metadata(f.name, &f.metadata))
            .collect();
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, record: &FileRecord) -> bool {
        self.records.contains(record)
    }

    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter()
    }
}

impl FromIterator<FileRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
