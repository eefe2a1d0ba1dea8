//! Data models for enchant
//!
//! Defines the core data structures: Enchantment, EnchantmentPatch,
//! RecordId and the EnchantmentsDocument used for snapshots and file
//! import/export.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single catalog entry offered for sale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enchantment {
    /// Catalog id or display name
    pub name: String,
    /// Enchantment level
    pub lvl: u32,
    /// Price, in emeralds
    pub price: f64,
}

impl Enchantment {
    /// Create a new enchantment record
    pub fn new(name: impl Into<String>, lvl: u32, price: f64) -> Self {
        Self {
            name: name.into(),
            lvl,
            price,
        }
    }

    /// Return a copy with the fields present in `patch` overwritten
    pub fn patched(&self, patch: &EnchantmentPatch) -> Self {
        let mut merged = self.clone();
        if let Some(ref name) = patch.name {
            merged.name = name.clone();
        }
        if let Some(lvl) = patch.lvl {
            merged.lvl = lvl;
        }
        if let Some(price) = patch.price {
            merged.price = price;
        }
        merged
    }
}

/// Partial update payload
///
/// Only the fields that are `Some` are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnchantmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lvl: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl EnchantmentPatch {
    /// Check whether the patch carries no fields at all
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.lvl.is_none() && self.price.is_none()
    }
}

/// Stable identifier assigned by the store when a record enters it
///
/// Ids live only as long as the process. They are never written to the
/// snapshot, so a reload assigns fresh ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(Uuid);

impl RecordId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The `{ "enchantments": [...] }` document
///
/// Shared shape of the persisted snapshot, the exported file and the
/// import payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnchantmentsDocument {
    #[serde(default)]
    pub enchantments: Vec<Enchantment>,
}

impl EnchantmentsDocument {
    pub fn new(enchantments: Vec<Enchantment>) -> Self {
        Self { enchantments }
    }

    /// Serialize as pretty JSON (two-space indent)
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
