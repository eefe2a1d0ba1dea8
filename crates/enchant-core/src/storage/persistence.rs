//! File-backed snapshot storage
//!
//! Each key is stored as `<dir>/<key>.json`. Writes are atomic (write to a
//! uniquely named temp file, sync, then rename) so a crash never leaves a
//! half-written snapshot behind and no neighbouring file is touched.
//!
//! Storage location: `~/.local/share/enchant/` (configurable via `Config`)

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::error::{StorageError, StorageResult};
use super::{check_key, SnapshotStorage};

/// Snapshot storage rooted at a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

/// Size and age of a stored snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    pub path: PathBuf,
    pub exists: bool,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl StorageStats {
    /// Human-readable size
    pub fn size_human(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;

        if self.size >= MB {
            format!("{:.1} MB", self.size as f64 / MB as f64)
        } else if self.size >= KB {
            format!("{:.1} KB", self.size as f64 / KB as f64)
        } else {
            format!("{} B", self.size)
        }
    }
}

impl FileStorage {
    /// Create storage rooted at `dir`
    ///
    /// The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Report on the file backing `key`
    pub fn stats(&self, key: &str) -> StorageStats {
        let path = self.path_for(key);
        match fs::metadata(&path) {
            Ok(meta) => StorageStats {
                exists: true,
                size: meta.len(),
                modified: meta.modified().ok().map(DateTime::<Utc>::from),
                path,
            },
            Err(_) => StorageStats {
                exists: false,
                size: 0,
                modified: None,
                path,
            },
        }
    }
}

impl SnapshotStorage for FileStorage {
    fn load(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        check_key(key)?;
        let path = self.path_for(key);

        match fs::read(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                Err(StorageError::from_io(e, path))
            }
            Err(source) => Err(StorageError::ReadError { path, source }),
        }
    }

    fn save(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        check_key(key)?;
        atomic_write(&self.path_for(key), value)
    }
}

/// Write data to a file atomically
///
/// 1. Write to a fresh temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// The temp file is removed if any step fails.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|source| StorageError::CreateDirectory {
        path: dir.to_path_buf(),
        source,
    })?;

    // Same directory as the target so the rename stays on one filesystem
    let mut temp = tempfile::Builder::new()
        .prefix(".enchant-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| StorageError::from_io(e, dir.to_path_buf()))?;
    let temp_path = temp.path().to_path_buf();

    temp.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    temp.persist(path)
        .map_err(|e| StorageError::AtomicWriteFailed {
            from: temp_path,
            to: path.to_path_buf(),
            source: e.error,
        })?;

    Ok(())
}
