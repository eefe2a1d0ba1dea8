//! In-memory snapshot storage
//!
//! Clones share the same map, so a caller can keep a handle to inspect what
//! the store wrote. Reads and writes can be switched to fail, which lets
//! callers exercise the best-effort persistence path without a broken disk.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::error::{StorageError, StorageResult};
use super::{check_key, SnapshotStorage};

#[derive(Debug, Default)]
struct Inner {
    values: Mutex<HashMap<String, Vec<u8>>>,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

/// Process-local snapshot storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of write attempts so far, failed ones included
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Make every following write fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every following read fail (or succeed again)
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Current value under `key` as text, bypassing the trait
    ///
    /// `None` also for values that aren't UTF-8; see `get_bytes`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_bytes(key)
            .and_then(|bytes| String::from_utf8(bytes).ok())
    }

    /// Current raw value under `key`, bypassing the trait
    pub fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.values().get(key).cloned()
    }

    fn values(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A poisoned map is still a valid map
        self.inner
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SnapshotStorage for MemoryStorage {
    fn load(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        check_key(key)?;

        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!(
                "reads from '{}' are disabled",
                key
            )));
        }

        Ok(self.values().get(key).cloned())
    }

    fn save(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        check_key(key)?;
        self.inner.writes.fetch_add(1, Ordering::SeqCst);

        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!(
                "writes to '{}' are disabled",
                key
            )));
        }

        self.values().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
