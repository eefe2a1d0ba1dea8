//! Record store
//!
//! The `EnchantmentStore` owns the ordered list of enchantments and is the
//! only way to change it:
//! - every record entering the store is validated against the catalog
//! - every mutation writes a snapshot before returning
//! - snapshot and sync failures never fail the mutation; they are logged
//!   and published as `StoreEvent`s
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = EnchantmentStore::open()?;
//! store.initialize(config.bootstrap_source().as_ref()).await;
//!
//! store.add(Enchantment::new("Sharpness", 3, 10.0))?;
//! let all = store.get_all();
//! ```
//!
//! Records are addressed by position (index into the current order) or by
//! `RecordId`. Positions shift when earlier records are deleted; ids don't.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::catalog::Catalog;
use crate::config::{Config, DEFAULT_STORE_NAME};
use crate::events::{EventSink, StoreEvent};
use crate::models::{Enchantment, EnchantmentPatch, EnchantmentsDocument, RecordId};
use crate::remote::{BootstrapSource, RemoteMirror};
use crate::schema::{self, ValidationError};
use crate::storage::persistence::atomic_write;
use crate::storage::{check_key, FileStorage, SnapshotStorage, StorageError};

/// Errors from an interactive file upload
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No file selected")]
    NoFile,

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("The file is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid enchantments file: {0}")]
    Validation(#[from] ValidationError),
}

/// Validated, persisted collection of enchantments
pub struct EnchantmentStore {
    records: Vec<(RecordId, Enchantment)>,
    catalog: Catalog,
    storage: Box<dyn SnapshotStorage>,
    store_name: String,
    mirror: Option<RemoteMirror>,
    events: EventSink,
    /// Set when an existing snapshot must not be overwritten
    save_blocked: Option<StorageError>,
}

impl EnchantmentStore {
    /// Create an empty store over `storage`
    pub fn new(storage: impl SnapshotStorage + 'static, catalog: Catalog) -> Self {
        Self {
            records: Vec::new(),
            catalog,
            storage: Box::new(storage),
            store_name: DEFAULT_STORE_NAME.to_string(),
            mirror: None,
            events: EventSink::default(),
            save_blocked: None,
        }
    }

    /// Use a different snapshot key
    pub fn with_store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = name.into();
        self
    }

    /// Mirror every saved snapshot to a remote endpoint
    pub fn with_mirror(mut self, mirror: RemoteMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Open the store described by the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(&config)
    }

    /// Open the store with a specific configuration
    ///
    /// The store starts empty; call `initialize` to load data.
    pub fn open_with_config(config: &Config) -> Result<Self> {
        check_key(&config.store_name).context("Invalid store_name")?;
        let catalog = Catalog::load_or_bundled(config.catalog_path.as_deref())
            .context("Failed to load enchantment catalog")?;
        let storage = FileStorage::new(&config.data_dir);

        let mut store = Self::new(storage, catalog).with_store_name(&config.store_name);
        if let Some(mirror) = config.mirror()? {
            store = store.with_mirror(mirror);
        }
        Ok(store)
    }

    /// Load initial data
    ///
    /// A valid snapshot wins. Without one, the bootstrap source (if any) is
    /// fetched, validated and persisted. Failures are logged, never
    /// returned: the result is always the current, possibly empty, list.
    pub async fn initialize(&mut self, source: Option<&BootstrapSource>) -> Vec<Enchantment> {
        if let Some(records) = self.load_snapshot() {
            info!("Loaded {} enchantments from snapshot", records.len());
            self.replace(records);
            return self.get_all();
        }

        let Some(source) = source else {
            return self.get_all();
        };

        match source.fetch().await {
            Ok(Some(text)) => match parse_document(&text, &self.catalog) {
                Ok(records) => {
                    info!(
                        "Bootstrapped {} enchantments from {}",
                        records.len(),
                        source.location()
                    );
                    self.replace(records);
                    self.save();
                }
                Err(e) => {
                    error!("Bootstrap data from {} rejected: {}", source.location(), e);
                    self.replace(Vec::new());
                }
            },
            Ok(None) => {
                info!("No bootstrap data at {}", source.location());
            }
            Err(e) => {
                error!("Error initializing store: {}", e);
                self.replace(Vec::new());
            }
        }

        self.get_all()
    }

    // ==================== Queries ====================

    /// Copy of all records, in store order
    pub fn get_all(&self) -> Vec<Enchantment> {
        self.records.iter().map(|(_, r)| r.clone()).collect()
    }

    /// Copy of all records with their ids
    pub fn entries(&self) -> Vec<(RecordId, Enchantment)> {
        self.records.clone()
    }

    /// Copy of the record at `index`
    pub fn get_by_id(&self, index: usize) -> Option<Enchantment> {
        self.records.get(index).map(|(_, r)| r.clone())
    }

    /// Copy of the record with `id`
    pub fn get(&self, id: RecordId) -> Option<Enchantment> {
        self.index_of(id).and_then(|index| self.get_by_id(index))
    }

    /// Current position of `id`
    pub fn index_of(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|(rid, _)| *rid == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Key the snapshot is stored under
    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn mirror(&self) -> Option<&RemoteMirror> {
        self.mirror.as_ref()
    }

    /// Receive persistence and sync outcomes from now on
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<StoreEvent> {
        self.events.subscribe()
    }

    // ==================== Mutations ====================

    /// Append a record
    pub fn add(&mut self, record: Enchantment) -> Result<Enchantment, ValidationError> {
        let stored = record.clone();
        self.insert(record)?;
        Ok(stored)
    }

    /// Append a record and return its id
    pub fn insert(&mut self, record: Enchantment) -> Result<RecordId, ValidationError> {
        schema::validate_record(&record, &self.catalog)?;

        let id = RecordId::generate();
        self.records.push((id, record));
        self.save();
        Ok(id)
    }

    /// Replace the record at `index`
    ///
    /// `Ok(false)` if there is no such record.
    pub fn update(&mut self, index: usize, record: Enchantment) -> Result<bool, ValidationError> {
        if index >= self.records.len() {
            return Ok(false);
        }
        schema::validate_record(&record, &self.catalog)?;

        self.records[index].1 = record;
        self.save();
        Ok(true)
    }

    /// Overwrite only the fields present in `patch`
    ///
    /// The merged record must still be valid.
    pub fn update_field(
        &mut self,
        index: usize,
        patch: &EnchantmentPatch,
    ) -> Result<bool, ValidationError> {
        let Some(merged) = self.records.get(index).map(|(_, r)| r.patched(patch)) else {
            return Ok(false);
        };
        schema::validate_record(&merged, &self.catalog)?;

        self.records[index].1 = merged;
        self.save();
        Ok(true)
    }

    /// Same as `update_field`
    pub fn update_partial(
        &mut self,
        index: usize,
        patch: &EnchantmentPatch,
    ) -> Result<bool, ValidationError> {
        self.update_field(index, patch)
    }

    /// Replace the record with `id`
    pub fn update_record(
        &mut self,
        id: RecordId,
        record: Enchantment,
    ) -> Result<bool, ValidationError> {
        match self.index_of(id) {
            Some(index) => self.update(index, record),
            None => Ok(false),
        }
    }

    /// Patch the record with `id`
    pub fn patch_record(
        &mut self,
        id: RecordId,
        patch: &EnchantmentPatch,
    ) -> Result<bool, ValidationError> {
        match self.index_of(id) {
            Some(index) => self.update_field(index, patch),
            None => Ok(false),
        }
    }

    /// Remove the record at `index`; later records move up by one
    pub fn delete(&mut self, index: usize) -> bool {
        if index >= self.records.len() {
            return false;
        }
        self.records.remove(index);
        self.save();
        true
    }

    /// Remove the record with `id`
    pub fn remove(&mut self, id: RecordId) -> bool {
        match self.index_of(id) {
            Some(index) => self.delete(index),
            None => false,
        }
    }

    /// Remove every record
    pub fn clear(&mut self) {
        self.records.clear();
        self.save();
    }

    // ==================== Import / Export ====================

    /// Current state as a document
    pub fn export_json(&self) -> EnchantmentsDocument {
        EnchantmentsDocument::new(self.get_all())
    }

    /// Replace all records with a validated payload
    ///
    /// On failure the current records are kept and `false` is returned.
    pub fn import_json(&mut self, payload: &Value) -> bool {
        match schema::validate(payload, &self.catalog) {
            Ok(records) => {
                info!("Imported {} enchantments", records.len());
                self.replace(records);
                self.save();
                true
            }
            Err(e) => {
                error!("Import rejected: {}", e);
                false
            }
        }
    }

    /// Write the export to `<dir>/<filename>.json`
    ///
    /// A trailing `.json` on `filename` is not doubled.
    pub fn download_json(&self, dir: &Path, filename: &str) -> Result<PathBuf> {
        let basename = filename.strip_suffix(".json").unwrap_or(filename);
        let path = dir.join(format!("{}.json", basename));

        let content = self
            .export_json()
            .to_pretty_json()
            .context("Failed to serialize enchantments")?;
        atomic_write(&path, content.as_bytes())
            .with_context(|| format!("Failed to write {:?}", path))?;

        info!("Exported {} enchantments to {:?}", self.len(), path);
        Ok(path)
    }

    /// Replace all records with the contents of a user-chosen file
    ///
    /// Unlike `import_json`, failures are returned to the caller.
    pub async fn upload_json(
        &mut self,
        path: Option<&Path>,
    ) -> Result<Vec<Enchantment>, UploadError> {
        let path = path.ok_or(UploadError::NoFile)?;
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| UploadError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        self.load_json_text(&text)
    }

    /// Replace all records with JSON text (pasted or already read)
    pub fn load_json_text(&mut self, text: &str) -> Result<Vec<Enchantment>, UploadError> {
        let records = parse_document(text, &self.catalog)?;
        self.replace(records);
        self.save();
        Ok(self.get_all())
    }

    // ==================== Internals ====================

    fn replace(&mut self, records: Vec<Enchantment>) {
        self.records = records
            .into_iter()
            .map(|record| (RecordId::generate(), record))
            .collect();
    }

    /// Read and validate the snapshot
    ///
    /// An absent snapshot is `None`. An undecodable or invalid one is copied
    /// to `<key>.corrupt` so it can be recovered by hand, then ignored. One
    /// that can't be read, or can't be backed up, blocks all later saves so
    /// it is never overwritten.
    fn load_snapshot(&mut self) -> Option<Vec<Enchantment>> {
        let key = self.store_name.clone();

        let raw = match self.storage.load(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!("Could not read snapshot '{}': {}", key, e);
                self.block_saves(&key, e.to_string());
                return None;
            }
        };

        let parsed = match std::str::from_utf8(&raw) {
            Ok(text) => parse_document(text, &self.catalog).map_err(|e| e.to_string()),
            Err(e) => Err(format!("not valid UTF-8: {}", e)),
        };

        match parsed {
            Ok(records) => Some(records),
            Err(reason) => {
                error!("Snapshot '{}' is invalid: {}", key, reason);
                let backup_key = format!("{}.corrupt", key);
                match self.storage.save(&backup_key, &raw) {
                    Ok(()) => warn!("Invalid snapshot backed up as '{}'", backup_key),
                    Err(e) => {
                        error!("Could not back up invalid snapshot: {}", e);
                        self.block_saves(&key, format!("backup failed: {}", e));
                    }
                }
                None
            }
        }
    }

    fn block_saves(&mut self, key: &str, reason: String) {
        self.save_blocked = Some(StorageError::Protected {
            key: key.to_string(),
            reason,
        });
    }

    /// Persist the current state; never fails the caller
    fn save(&self) {
        let key = self.store_name.clone();

        if let Some(ref blocked) = self.save_blocked {
            self.persist_failed(key, blocked);
            return;
        }

        let body = match serde_json::to_string(&self.export_json()) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize enchantments: {}", e);
                self.events.emit(StoreEvent::PersistFailed {
                    key,
                    error: e.to_string(),
                    suggestion: None,
                });
                return;
            }
        };

        match self.storage.save(&key, body.as_bytes()) {
            Ok(()) => {
                debug!("Saved {} enchantments to '{}'", self.records.len(), key);
                self.events.emit(StoreEvent::Persisted { key });
            }
            Err(e) => self.persist_failed(key, &e),
        }

        if let Some(ref mirror) = self.mirror {
            mirror.spawn_push(body, self.events.clone());
        }
    }

    fn persist_failed(&self, key: String, error: &StorageError) {
        if error.is_recoverable() {
            warn!("Enchantments kept in memory only, save failed: {}", error);
        } else {
            error!("Enchantments kept in memory only, save failed: {}", error);
        }
        self.events.emit(StoreEvent::PersistFailed {
            key,
            error: error.to_string(),
            suggestion: error.recovery_suggestion().map(str::to_string),
        });
    }
}

/// Parse JSON text and validate it as a document
fn parse_document(text: &str, catalog: &Catalog) -> Result<Vec<Enchantment>, UploadError> {
    let payload: Value = serde_json::from_str(text)?;
    Ok(schema::validate(&payload, catalog)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::test_server::serve_once;
    use crate::storage::MemoryStorage;
    use serde_json::json;
    use tempfile::TempDir;

    fn memory_store() -> (EnchantmentStore, MemoryStorage) {
        let storage = MemoryStorage::new();
        let store = EnchantmentStore::new(storage.clone(), Catalog::bundled().unwrap());
        (store, storage)
    }

    fn a() -> Enchantment {
        Enchantment::new("Sharpness", 3, 10.0)
    }

    fn b() -> Enchantment {
        Enchantment::new("Mending", 1, 24.0)
    }

    fn c() -> Enchantment {
        Enchantment::new("efficiency", 5, 12.0)
    }

    fn store_with_abc() -> (EnchantmentStore, MemoryStorage) {
        let (mut store, storage) = memory_store();
        store.add(a()).unwrap();
        store.add(b()).unwrap();
        store.add(c()).unwrap();
        (store, storage)
    }

    fn test_config(temp_dir: &TempDir) -> Config {
        Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        }
    }

    fn snapshot(storage: &MemoryStorage) -> EnchantmentsDocument {
        serde_json::from_str(&storage.get("enchantments").unwrap()).unwrap()
    }

    // ==================== CRUD ====================

    #[test]
    fn test_add_and_get() {
        let (mut store, _) = memory_store();
        assert!(store.is_empty());

        let added = store.add(a()).unwrap();
        assert_eq!(added, a());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_by_id(0), Some(a()));
    }

    #[test]
    fn test_get_all_returns_a_copy() {
        let (store, _) = store_with_abc();

        let mut all = store.get_all();
        all.clear();
        let mut first = store.get_by_id(0).unwrap();
        first.price = 64.0;

        assert_eq!(store.get_all(), vec![a(), b(), c()]);
    }

    #[test]
    fn test_add_rejects_records_outside_catalog() {
        let (mut store, storage) = memory_store();

        let invalid = [
            Enchantment::new("NotARealEnchantment", 1, 10.0),
            Enchantment::new("Mending", 2, 10.0),
            Enchantment::new("Sharpness", 3, 0.0),
            Enchantment::new("Sharpness", 3, 65.0),
        ];
        for record in invalid {
            assert!(store.add(record).is_err());
        }

        assert!(store.is_empty());
        assert_eq!(storage.write_count(), 0);
    }

    #[test]
    fn test_bounds_safety() {
        let (mut store, storage) = store_with_abc();
        let writes = storage.write_count();

        for index in [3, 4, usize::MAX] {
            assert!(store.get_by_id(index).is_none());
            assert_eq!(store.update(index, a()), Ok(false));
            assert_eq!(
                store.update_field(index, &EnchantmentPatch::default()),
                Ok(false)
            );
            assert!(!store.delete(index));
        }

        assert_eq!(store.get_all(), vec![a(), b(), c()]);
        assert_eq!(storage.write_count(), writes);
    }

    #[test]
    fn test_update_replaces_record() {
        let (mut store, storage) = store_with_abc();

        let replacement = Enchantment::new("Protection", 4, 30.0);
        assert_eq!(store.update(1, replacement.clone()), Ok(true));

        assert_eq!(store.get_all(), vec![a(), replacement.clone(), c()]);
        assert_eq!(snapshot(&storage).enchantments[1], replacement);
    }

    #[test]
    fn test_update_rejects_invalid_record() {
        let (mut store, _) = store_with_abc();

        let err = store
            .update(0, Enchantment::new("Sharpness", 6, 10.0))
            .unwrap_err();
        assert!(err.has_issue_at("record.lvl"));
        assert_eq!(store.get_by_id(0), Some(a()));
    }

    #[test]
    fn test_update_field_preserves_untouched_fields() {
        let (mut store, _) = memory_store();
        store.add(Enchantment::new("Sharpness", 3, 10.0)).unwrap();

        let patch = EnchantmentPatch {
            price: Some(20.0),
            ..Default::default()
        };
        assert_eq!(store.update_field(0, &patch), Ok(true));
        assert_eq!(store.get_by_id(0), Some(Enchantment::new("Sharpness", 3, 20.0)));

        let patch = EnchantmentPatch {
            lvl: Some(5),
            ..Default::default()
        };
        assert_eq!(store.update_partial(0, &patch), Ok(true));
        assert_eq!(store.get_by_id(0), Some(Enchantment::new("Sharpness", 5, 20.0)));
    }

    #[test]
    fn test_update_field_validates_merged_record() {
        let (mut store, _) = memory_store();
        store.add(Enchantment::new("Sharpness", 5, 10.0)).unwrap();

        // Level 5 is fine for Sharpness but not for Mending
        let patch = EnchantmentPatch {
            name: Some("Mending".to_string()),
            ..Default::default()
        };
        assert!(store.update_field(0, &patch).is_err());
        assert_eq!(store.get_by_id(0).unwrap().name, "Sharpness");
    }

    #[test]
    fn test_delete_reindexes() {
        let (mut store, storage) = store_with_abc();

        assert!(store.delete(1));
        assert_eq!(store.get_all(), vec![a(), c()]);
        assert_eq!(store.get_by_id(1), Some(c()));
        assert_eq!(snapshot(&storage).enchantments, vec![a(), c()]);
    }

    #[test]
    fn test_record_ids_survive_other_deletes() {
        let (mut store, _) = store_with_abc();
        let entries = store.entries();
        let (id_b, id_c) = (entries[1].0, entries[2].0);

        assert_eq!(store.index_of(id_c), Some(2));
        assert!(store.remove(id_b));

        assert_eq!(store.index_of(id_c), Some(1));
        assert_eq!(store.get(id_c), Some(c()));
        assert!(store.get(id_b).is_none());
        assert!(!store.remove(id_b));
    }

    #[test]
    fn test_mutations_by_id() {
        let (mut store, _) = store_with_abc();
        let id = store.entries()[2].0;

        let patch = EnchantmentPatch {
            price: Some(40.0),
            ..Default::default()
        };
        assert_eq!(store.patch_record(id, &patch), Ok(true));
        assert_eq!(store.get(id).unwrap().price, 40.0);

        let replacement = Enchantment::new("Unbreaking", 3, 8.0);
        assert_eq!(store.update_record(id, replacement.clone()), Ok(true));
        assert_eq!(store.get(id), Some(replacement));

        let inserted = store.insert(a()).unwrap();
        assert_eq!(store.index_of(inserted), Some(3));
    }

    #[test]
    fn test_mutations_by_unknown_id() {
        let (mut store, _) = store_with_abc();
        let id = store.entries()[0].0;
        assert!(store.delete(0));

        assert_eq!(store.update_record(id, a()), Ok(false));
        assert_eq!(
            store.patch_record(id, &EnchantmentPatch::default()),
            Ok(false)
        );
    }

    #[test]
    fn test_clear() {
        let (mut store, storage) = store_with_abc();

        store.clear();
        assert!(store.is_empty());
        assert!(snapshot(&storage).enchantments.is_empty());
    }

    // ==================== Persistence ====================

    #[test]
    fn test_every_mutation_persists() {
        let (mut store, storage) = memory_store();
        let patch = EnchantmentPatch {
            price: Some(11.0),
            ..Default::default()
        };

        store.add(a()).unwrap();
        assert_eq!(storage.write_count(), 1);
        store.update(0, b()).unwrap();
        assert_eq!(storage.write_count(), 2);
        store.update_field(0, &patch).unwrap();
        assert_eq!(storage.write_count(), 3);
        store.delete(0);
        assert_eq!(storage.write_count(), 4);
        store.clear();
        assert_eq!(storage.write_count(), 5);
        assert!(store.import_json(&json!({"enchantments": [{"name": "Mending", "lvl": 1, "price": 5}]})));
        assert_eq!(storage.write_count(), 6);

        assert_eq!(snapshot(&storage), store.export_json());
    }

    #[test]
    fn test_persist_events() {
        let (mut store, _) = memory_store();
        let mut events = store.subscribe();

        store.add(a()).unwrap();

        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::Persisted {
                key: "enchantments".to_string()
            }
        );
    }

    #[test]
    fn test_persist_failure_does_not_fail_mutation() {
        let (mut store, storage) = memory_store();
        let mut events = store.subscribe();
        storage.set_fail_writes(true);

        assert!(store.add(a()).is_ok());
        assert_eq!(store.get_all(), vec![a()]);
        assert!(store.delete(0));

        for _ in 0..2 {
            match events.try_recv().unwrap() {
                StoreEvent::PersistFailed {
                    key,
                    error,
                    suggestion,
                } => {
                    assert_eq!(key, "enchantments");
                    assert!(error.contains("disabled"));
                    assert!(suggestion.is_none());
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(storage.write_count(), 2);
        assert!(storage.get("enchantments").is_none());
    }

    #[test]
    fn test_custom_store_name() {
        let storage = MemoryStorage::new();
        let mut store =
            EnchantmentStore::new(storage.clone(), Catalog::bundled().unwrap())
                .with_store_name("villager");

        store.add(a()).unwrap();
        assert_eq!(store.store_name(), "villager");
        assert!(storage.get("villager").is_some());
        assert!(storage.get("enchantments").is_none());
    }

    // ==================== Import / Export ====================

    #[test]
    fn test_export_is_idempotent() {
        let (store, _) = store_with_abc();
        assert_eq!(store.export_json(), store.export_json());
    }

    #[test]
    fn test_import_export_round_trip() {
        let (source, _) = store_with_abc();
        let payload = serde_json::to_value(source.export_json()).unwrap();

        let (mut target, _) = memory_store();
        assert!(target.import_json(&payload));
        assert_eq!(target.get_all(), source.get_all());
    }

    #[test]
    fn test_import_empty_payloads() {
        for payload in [json!({}), json!({"enchantments": []})] {
            let (mut store, storage) = store_with_abc();
            assert!(store.import_json(&payload));
            assert!(store.is_empty());
            assert!(snapshot(&storage).enchantments.is_empty());
        }
    }

    #[test]
    fn test_import_invalid_keeps_state() {
        let (mut store, storage) = store_with_abc();
        let writes = storage.write_count();

        let payloads = [
            json!({"enchantments": [{"name": "NotARealEnchantment", "lvl": 1, "price": 1}]}),
            json!({"enchantments": "nope"}),
            json!("just a string"),
        ];
        for payload in payloads {
            assert!(!store.import_json(&payload));
        }

        assert_eq!(store.get_all(), vec![a(), b(), c()]);
        assert_eq!(storage.write_count(), writes);
    }

    #[test]
    fn test_download_json() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = store_with_abc();

        let path = store.download_json(temp_dir.path(), "shop").unwrap();
        assert_eq!(path, temp_dir.path().join("shop.json"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, store.export_json().to_pretty_json().unwrap());

        // Extension not doubled
        let path = store.download_json(temp_dir.path(), "shop.json").unwrap();
        assert_eq!(path, temp_dir.path().join("shop.json"));
    }

    #[tokio::test]
    async fn test_upload_json_success() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("upload.json");
        std::fs::write(
            &path,
            r#"{"enchantments": [{"name": "Mending", "lvl": 1, "price": 20}]}"#,
        )
        .unwrap();

        let (mut store, storage) = store_with_abc();
        let records = store.upload_json(Some(&path)).await.unwrap();

        assert_eq!(records, vec![Enchantment::new("Mending", 1, 20.0)]);
        assert_eq!(store.get_all(), records);
        assert_eq!(snapshot(&storage).enchantments, records);
    }

    #[tokio::test]
    async fn test_upload_json_failures() {
        let temp_dir = TempDir::new().unwrap();
        let (mut store, _) = store_with_abc();

        let err = store.upload_json(None).await.unwrap_err();
        assert!(matches!(err, UploadError::NoFile));
        assert_eq!(err.to_string(), "No file selected");

        let missing = temp_dir.path().join("missing.json");
        let err = store.upload_json(Some(&missing)).await.unwrap_err();
        assert!(matches!(err, UploadError::Read { .. }));

        let garbage = temp_dir.path().join("garbage.json");
        std::fs::write(&garbage, "{ not json").unwrap();
        let err = store.upload_json(Some(&garbage)).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidJson(_)));

        let invalid = temp_dir.path().join("invalid.json");
        std::fs::write(
            &invalid,
            r#"{"enchantments": [{"name": "Mending", "lvl": 3, "price": 20}]}"#,
        )
        .unwrap();
        let err = store.upload_json(Some(&invalid)).await.unwrap_err();
        assert!(matches!(err, UploadError::Validation(_)));
        assert!(err.to_string().contains("Invalid level"));

        assert_eq!(store.get_all(), vec![a(), b(), c()]);
    }

    #[test]
    fn test_load_json_text() {
        let (mut store, _) = memory_store();

        let records = store
            .load_json_text(r#"{"enchantments": [{"name": "smite", "lvl": 2, "price": 3}]}"#)
            .unwrap();
        assert_eq!(records, vec![Enchantment::new("smite", 2, 3.0)]);
    }

    // ==================== Initialize ====================

    #[tokio::test]
    async fn test_initialize_without_data() {
        let (mut store, storage) = memory_store();

        assert!(store.initialize(None).await.is_empty());
        assert_eq!(storage.write_count(), 0);
    }

    #[tokio::test]
    async fn test_initialize_prefers_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let seed = temp_dir.path().join("seed.json");
        std::fs::write(
            &seed,
            r#"{"enchantments": [{"name": "Mending", "lvl": 1, "price": 20}]}"#,
        )
        .unwrap();

        let storage = MemoryStorage::new();
        storage
            .save(
                "enchantments",
                br#"{"enchantments": [{"name": "Sharpness", "lvl": 3, "price": 10}]}"#,
            )
            .unwrap();

        let mut store = EnchantmentStore::new(storage.clone(), Catalog::bundled().unwrap());
        let records = store.initialize(Some(&BootstrapSource::File(seed))).await;

        assert_eq!(records, vec![a()]);
        // Loading a snapshot doesn't rewrite it
        assert_eq!(storage.write_count(), 1);
    }

    #[tokio::test]
    async fn test_initialize_from_bootstrap_file() {
        let temp_dir = TempDir::new().unwrap();
        let seed = temp_dir.path().join("seed.json");
        std::fs::write(
            &seed,
            r#"{"enchantments": [{"name": "Mending", "lvl": 1, "price": 24, "extra": true}]}"#,
        )
        .unwrap();

        let (mut store, storage) = memory_store();
        let records = store.initialize(Some(&BootstrapSource::File(seed))).await;

        assert_eq!(records, vec![b()]);
        assert_eq!(snapshot(&storage).enchantments, vec![b()]);
    }

    #[tokio::test]
    async fn test_initialize_rejects_invalid_bootstrap() {
        let temp_dir = TempDir::new().unwrap();
        let seed = temp_dir.path().join("seed.json");
        std::fs::write(
            &seed,
            r#"{"enchantments": [{"name": "Mending", "lvl": 1, "price": 500}]}"#,
        )
        .unwrap();

        let (mut store, storage) = memory_store();
        assert!(store
            .initialize(Some(&BootstrapSource::File(seed)))
            .await
            .is_empty());
        assert_eq!(storage.write_count(), 0);
    }

    #[tokio::test]
    async fn test_initialize_absorbs_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let seed = temp_dir.path().join("seed.json");
        std::fs::write(&seed, "<html>not json</html>").unwrap();

        let (mut store, _) = memory_store();
        assert!(store
            .initialize(Some(&BootstrapSource::File(seed)))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_initialize_missing_bootstrap_file() {
        let temp_dir = TempDir::new().unwrap();
        let (mut store, _) = memory_store();

        let source = BootstrapSource::File(temp_dir.path().join("nope.json"));
        assert!(store.initialize(Some(&source)).await.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_backs_up_invalid_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let seed = temp_dir.path().join("seed.json");
        std::fs::write(
            &seed,
            r#"{"enchantments": [{"name": "Mending", "lvl": 1, "price": 24}]}"#,
        )
        .unwrap();

        let storage = MemoryStorage::new();
        let corrupt = r#"{"enchantments": [{"name": "Bogus", "lvl": 1, "price": 1}]}"#;
        storage.save("enchantments", corrupt.as_bytes()).unwrap();

        let mut store = EnchantmentStore::new(storage.clone(), Catalog::bundled().unwrap());
        let records = store.initialize(Some(&BootstrapSource::File(seed))).await;

        assert_eq!(records, vec![b()]);
        assert_eq!(storage.get("enchantments.corrupt").as_deref(), Some(corrupt));
        assert_eq!(snapshot(&storage).enchantments, vec![b()]);
    }

    #[tokio::test]
    async fn test_initialize_backs_up_non_utf8_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("enchantments.json");
        let damaged: &[u8] =
            b"{\"enchantments\": [{\"name\": \"Sharpness\xff\", \"lvl\": 3, \"price\": 10}]}";
        std::fs::write(&path, damaged).unwrap();

        let mut store = EnchantmentStore::new(
            FileStorage::new(temp_dir.path()),
            Catalog::bundled().unwrap(),
        );
        let records = store.initialize(None).await;
        assert!(records.is_empty());

        store.add(b()).unwrap();

        let backup = std::fs::read(temp_dir.path().join("enchantments.corrupt.json")).unwrap();
        assert_eq!(backup, damaged);
        let saved: EnchantmentsDocument =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved.enchantments, vec![b()]);
    }

    #[tokio::test]
    async fn test_unreadable_snapshot_is_never_overwritten() {
        let storage = MemoryStorage::new();
        let original = br#"{"enchantments": [{"name": "Sharpness", "lvl": 3, "price": 10}]}"#;
        storage.save("enchantments", original).unwrap();
        storage.set_fail_reads(true);

        let mut store = EnchantmentStore::new(storage.clone(), Catalog::bundled().unwrap());
        let mut events = store.subscribe();
        assert!(store.initialize(None).await.is_empty());

        assert!(store.add(b()).is_ok());
        assert_eq!(store.get_all(), vec![b()]);

        match events.try_recv().unwrap() {
            StoreEvent::PersistFailed {
                key, suggestion, ..
            } => {
                assert_eq!(key, "enchantments");
                assert!(suggestion.is_some());
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(storage.write_count(), 1);
        assert_eq!(
            storage.get_bytes("enchantments").as_deref(),
            Some(&original[..])
        );
    }

    #[tokio::test]
    async fn test_failed_backup_blocks_saves() {
        let storage = MemoryStorage::new();
        let corrupt = r#"{"enchantments": [{"name": "Bogus", "lvl": 1, "price": 1}]}"#;
        storage.save("enchantments", corrupt.as_bytes()).unwrap();
        storage.set_fail_writes(true);

        let mut store = EnchantmentStore::new(storage.clone(), Catalog::bundled().unwrap());
        assert!(store.initialize(None).await.is_empty());
        assert!(storage.get("enchantments.corrupt").is_none());

        storage.set_fail_writes(false);
        store.add(a()).unwrap();

        assert_eq!(storage.get("enchantments").as_deref(), Some(corrupt));
    }

    #[tokio::test]
    async fn test_initialize_from_remote_bootstrap() {
        let (base, request) = serve_once(
            "200 OK",
            r#"{"enchantments": [{"name": "Sharpness", "lvl": 3, "price": 10}]}"#,
        )
        .await;

        let (mut store, _) = memory_store();
        let records = store
            .initialize(Some(&BootstrapSource::remote(base, "enchantments")))
            .await;

        assert_eq!(records, vec![a()]);
        assert!(request
            .await
            .unwrap()
            .starts_with("GET /enchantments.json"));
    }

    #[tokio::test]
    async fn test_initialize_remote_not_found() {
        let (base, _request) = serve_once("404 Not Found", "").await;

        let (mut store, storage) = memory_store();
        let records = store
            .initialize(Some(&BootstrapSource::remote(base, "enchantments")))
            .await;

        assert!(records.is_empty());
        assert_eq!(storage.write_count(), 0);
    }

    #[tokio::test]
    async fn test_initialize_absorbs_transport_errors() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (mut store, _) = memory_store();
        let source = BootstrapSource::remote(format!("http://{}", addr), "enchantments");
        assert!(store.initialize(Some(&source)).await.is_empty());
    }

    // ==================== Remote mirror ====================

    #[tokio::test]
    async fn test_mirror_receives_export() {
        let (base, request) = serve_once("200 OK", "").await;
        let mirror = RemoteMirror::new(format!("{}/enchantments.json", base)).unwrap();

        let (store, _) = memory_store();
        let mut store = store.with_mirror(mirror);
        let mut events = store.subscribe();

        store.add(a()).unwrap();

        assert!(matches!(
            events.recv().await.unwrap(),
            StoreEvent::Persisted { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            StoreEvent::Synced { .. }
        ));

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /enchantments.json"));
        assert!(request.ends_with(&serde_json::to_string(&store.export_json()).unwrap()));
    }

    #[tokio::test]
    async fn test_mirror_failure_is_not_surfaced() {
        let (base, _request) = serve_once("500 Internal Server Error", "").await;
        let mirror = RemoteMirror::new(base).unwrap();

        let (store, storage) = memory_store();
        let mut store = store.with_mirror(mirror);
        let mut events = store.subscribe();

        assert!(store.add(a()).is_ok());
        assert!(storage.get("enchantments").is_some());

        assert!(matches!(
            events.recv().await.unwrap(),
            StoreEvent::Persisted { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            StoreEvent::SyncFailed { .. }
        ));
    }

    // ==================== File-backed store ====================

    #[tokio::test]
    async fn test_data_persists_across_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        {
            let mut store = EnchantmentStore::open_with_config(&config).unwrap();
            store.initialize(None).await;
            store.add(a()).unwrap();
            store.add(b()).unwrap();
        }

        assert!(config.snapshot_path().exists());

        let mut store = EnchantmentStore::open_with_config(&config).unwrap();
        let records = store.initialize(None).await;
        assert_eq!(records, vec![a(), b()]);
    }

    #[test]
    fn test_open_with_custom_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let catalog_path = temp_dir.path().join("catalog.json");
        std::fs::write(
            &catalog_path,
            r#"[{"id": "glow", "name": "Glow", "minLvl": 1, "maxLvl": 2}]"#,
        )
        .unwrap();

        let config = Config {
            catalog_path: Some(catalog_path),
            ..test_config(&temp_dir)
        };
        let mut store = EnchantmentStore::open_with_config(&config).unwrap();

        assert!(store.add(Enchantment::new("Glow", 2, 5.0)).is_ok());
        assert!(store.add(a()).is_err());
    }

    #[test]
    fn test_open_rejects_store_name_with_separator() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["a/b", "..", ""] {
            let config = Config {
                store_name: name.to_string(),
                ..test_config(&temp_dir)
            };
            assert!(EnchantmentStore::open_with_config(&config).is_err());
        }
    }

    #[test]
    fn test_open_with_missing_catalog_fails() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            catalog_path: Some(temp_dir.path().join("missing.json")),
            ..test_config(&temp_dir)
        };

        assert!(EnchantmentStore::open_with_config(&config).is_err());
    }
}
