//! Enchant Core Library
//!
//! This crate provides the core functionality for Enchant, a small
//! price list for Minecraft enchantments kept on the local machine.
//!
//! # Architecture
//!
//! - **Catalog**: read-only list of known enchantments and their levels
//! - **Schema**: every record entering the store is checked against it
//! - **Snapshot**: the whole collection is written after each mutation
//!
//! All queries are served from the in-memory list owned by the store.
//!
//! # Quick Start
//!
//! ```text
//! let mut store = EnchantmentStore::open()?;
//! store.initialize(None).await;
//!
//! // Add an enchantment
//! store.add(Enchantment::new("Sharpness", 3, 10.0))?;
//!
//! // Query enchantments
//! let all = store.get_all();
//! ```
//!
//! # Modules
//!
//! - `store`: Record store (main entry point)
//! - `models`: Enchantment records and documents
//! - `catalog`: Known enchantments and level ranges
//! - `schema`: Payload and record validation
//! - `storage`: Snapshot persistence
//! - `remote`: Bootstrap source and remote mirror
//! - `sort`: Table sorting helpers
//! - `config`: Application configuration

pub mod catalog;
pub mod config;
mod events;
pub mod models;
pub mod remote;
pub mod schema;
pub mod sort;
pub mod storage;
pub mod store;

pub use catalog::{Catalog, CatalogEntry, CatalogError};
pub use config::Config;
pub use events::StoreEvent;
pub use models::{Enchantment, EnchantmentPatch, EnchantmentsDocument, RecordId};
pub use remote::{BootstrapSource, FetchError, MirrorError, RemoteMirror};
pub use schema::{Issue, ValidationError, MAX_PRICE, MIN_PRICE};
pub use sort::{sort_enchantments, SortColumn, SortOrder, SortState};
pub use storage::{FileStorage, MemoryStorage, SnapshotStorage, StorageError, StorageStats};
pub use store::{EnchantmentStore, UploadError};
