//! Enchantment catalog
//!
//! Read-only reference data: which enchantment names exist and which levels
//! each one allows. The default catalog is compiled into the library from
//! `assets/enchantments.json`; a different file can be configured instead.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const BUNDLED_CATALOG: &str = include_str!("../assets/enchantments.json");

/// Errors that can occur while loading a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog format: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Catalog entry '{id}' has an empty level range ({min}..={max})")]
    EmptyRange { id: String, min: u32, max: u32 },
}

/// One known enchantment and its allowed levels
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default = "default_min_lvl")]
    pub min_lvl: u32,
    #[serde(default = "default_max_lvl")]
    pub max_lvl: u32,
}

impl CatalogEntry {
    pub fn levels(&self) -> RangeInclusive<u32> {
        self.min_lvl..=self.max_lvl
    }
}

fn default_min_lvl() -> u32 {
    1
}

fn default_max_lvl() -> u32 {
    5
}

/// Ordered list of known enchantments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog from entries
    pub fn new(entries: Vec<CatalogEntry>) -> Result<Self, CatalogError> {
        if let Some(bad) = entries.iter().find(|e| e.min_lvl > e.max_lvl) {
            return Err(CatalogError::EmptyRange {
                id: bad.id.clone(),
                min: bad.min_lvl,
                max: bad.max_lvl,
            });
        }
        Ok(Self { entries })
    }

    /// Parse a catalog from its JSON form (an array of entries)
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
        Self::new(entries)
    }

    /// Load a catalog file from disk
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// The catalog shipped with the library
    ///
    /// Parsed once per process.
    pub fn bundled() -> Result<Self, CatalogError> {
        static BUNDLED: OnceLock<Result<Catalog, String>> = OnceLock::new();
        BUNDLED
            .get_or_init(|| Self::from_json(BUNDLED_CATALOG).map_err(|e| e.to_string()))
            .clone()
            .map_err(|msg| {
                CatalogError::Format(serde::de::Error::custom(format!("bundled catalog: {msg}")))
            })
    }

    /// Load `path` when given, otherwise the bundled catalog
    pub fn load_or_bundled(path: Option<&Path>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::bundled(),
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by id, falling back to display name
    ///
    /// Both comparisons are exact and case-sensitive.
    pub fn find(&self, name_or_id: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.id == name_or_id)
            .or_else(|| self.entries.iter().find(|e| e.name == name_or_id))
    }

    pub fn contains(&self, name_or_id: &str) -> bool {
        self.find(name_or_id).is_some()
    }

    /// Allowed levels for an enchantment
    pub fn levels(&self, name_or_id: &str) -> Option<RangeInclusive<u32>> {
        self.find(name_or_id).map(CatalogEntry::levels)
    }

    /// Display names, in catalog order
    pub fn display_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }
}
