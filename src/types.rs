// src/types.rs

use std::fmt;
use std::path::PathBuf;
use std::time::SystemTime;

/// Kind of filesystem change reported by the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Created,
    Modified,
    Deleted,
    Renamed,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeType::Created => "created",
            ChangeType::Modified => "modified",
            ChangeType::Deleted => "deleted",
            ChangeType::Renamed => "renamed",
        };
        f.write_str(s)
    }
}

/// One normalised filesystem change.
///
/// Created by the watcher and consumed by the debouncer; lives only until the
/// next debounce flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChangeEvent {
    pub full_path: PathBuf,
    /// Path relative to the watched root, with `/` separators.
    pub relative_path: String,
    pub change_type: ChangeType,
    pub timestamp: SystemTime,
}

impl FileChangeEvent {
    pub fn new(
        full_path: impl Into<PathBuf>,
        relative_path: impl Into<String>,
        change_type: ChangeType,
    ) -> Self {
        Self {
            full_path: full_path.into(),
            relative_path: relative_path.into(),
            change_type,
            timestamp: SystemTime::now(),
        }
    }
}

impl fmt::Display for FileChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.relative_path, self.change_type)
    }
}
