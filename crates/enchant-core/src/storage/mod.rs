//! Storage layer
//!
//! Key-value snapshot persistence for the record store.
//!
//! ## Backends
//!
//! - **FileStorage**: one JSON file per key under the data directory,
//!   written atomically
//! - **MemoryStorage**: process-local map, shared between clones
//!
//! The store writes its whole collection under a single key after every
//! mutation, so backends only need whole-value get/set semantics.

pub mod error;
pub mod memory;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStorage;
pub use persistence::{FileStorage, StorageStats};

/// Key-value backend holding serialized snapshots
///
/// Values are raw bytes: a backend never decides whether a snapshot is
/// readable text, so a damaged one can still be handed back and kept.
pub trait SnapshotStorage: Send + Sync {
    /// Load the value stored under `key`, or `None` if there is none
    fn load(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    fn save(&self, key: &str, value: &[u8]) -> StorageResult<()>;
}

/// Reject keys that cannot be used as a single file name
pub fn check_key(key: &str) -> StorageResult<()> {
    let invalid = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StorageError::InvalidKey {
            key: key.to_string(),
        });
    }
    Ok(())
}
