//! Schema validation
//!
//! Checks untyped JSON (imports, bootstrap data, snapshots) against the
//! shape and domain rules of an enchantment collection, and produces typed
//! records only when the whole batch is valid.
//!
//! Rules, per record:
//! - `name`: non-empty string equal to a catalog id or display name
//! - `lvl`: positive integer inside the matched entry's level range
//! - `price`: number between 1 and 64 inclusive
//!
//! Every violation is collected so the error can report all of them at once.

use std::fmt;

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::catalog::{Catalog, CatalogEntry};
use crate::models::Enchantment;

/// Lowest accepted price
pub const MIN_PRICE: f64 = 1.0;

/// Highest accepted price
pub const MAX_PRICE: f64 = 64.0;

/// A single rule violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Location of the offending value, e.g. `enchantments[2].lvl`
    pub path: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// All violations found in one payload
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", join_issues(.issues))]
pub struct ValidationError {
    issues: Vec<Issue>,
}

impl ValidationError {
    fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            issues: vec![Issue {
                path: path.into(),
                message: message.into(),
            }],
        }
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Check whether any issue points at `path`
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

fn join_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(Issue::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects issues while walking a payload
#[derive(Default)]
struct Issues(Vec<Issue>);

impl Issues {
    fn push(&mut self, path: &str, field: &str, message: impl Into<String>) {
        let path = if field.is_empty() {
            path.to_string()
        } else {
            format!("{}.{}", path, field)
        };
        self.0.push(Issue {
            path,
            message: message.into(),
        });
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(ValidationError { issues: self.0 })
        }
    }
}

/// Validate an `{ "enchantments": [...] }` payload
///
/// A missing `enchantments` field is an empty collection. Any invalid record
/// fails the whole batch. Fields other than `name`, `lvl` and `price` are
/// dropped from the returned records.
pub fn validate(payload: &Value, catalog: &Catalog) -> Result<Vec<Enchantment>, ValidationError> {
    let Some(object) = payload.as_object() else {
        return Err(ValidationError::single(
            "",
            "Expected an object with an 'enchantments' array",
        ));
    };

    let items = match object.get("enchantments") {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ValidationError::single("enchantments", "Expected an array")),
    };

    let mut issues = Issues::default();
    let mut records = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let path = format!("enchantments[{}]", index);
        match item.as_object() {
            Some(fields) => {
                if let Some(record) = check_fields(fields, &path, catalog, &mut issues) {
                    records.push(record);
                }
            }
            None => issues.push(&path, "", "Expected an object"),
        }
    }

    issues.finish(records)
}

/// Validate a typed record against the catalog
///
/// Used for records that enter the store programmatically.
pub fn validate_record(record: &Enchantment, catalog: &Catalog) -> Result<(), ValidationError> {
    let path = "record";
    let mut issues = Issues::default();

    let entry = check_name(&record.name, path, catalog, &mut issues);
    if record.lvl == 0 {
        issues.push(path, "lvl", "Level must be a positive integer");
    } else if let Some(entry) = entry {
        check_level_range(record.lvl, &record.name, entry, path, &mut issues);
    }
    check_price(record.price, path, &mut issues);

    issues.finish(())
}

fn check_fields(
    fields: &Map<String, Value>,
    path: &str,
    catalog: &Catalog,
    issues: &mut Issues,
) -> Option<Enchantment> {
    let name = match fields.get("name") {
        Some(Value::String(name)) => Some(name.as_str()),
        _ => {
            issues.push(path, "name", "Expected a string");
            None
        }
    };
    let entry = name.and_then(|name| check_name(name, path, catalog, issues));

    let lvl = match fields.get("lvl") {
        Some(Value::Number(n)) => check_level(n, path, issues),
        _ => {
            issues.push(path, "lvl", "Expected a number");
            None
        }
    };
    // Range check only once both the name and the level are known good
    if let (Some(name), Some(entry), Some(lvl)) = (name, entry, lvl) {
        check_level_range(lvl, name, entry, path, issues);
    }

    let price = match fields.get("price").and_then(Value::as_f64) {
        Some(price) if check_price(price, path, issues) => Some(price),
        Some(_) => None,
        None => {
            issues.push(path, "price", "Expected a number");
            None
        }
    };

    Some(Enchantment::new(name?, lvl?, price?)).filter(|_| entry.is_some())
}

fn check_name<'c>(
    name: &str,
    path: &str,
    catalog: &'c Catalog,
    issues: &mut Issues,
) -> Option<&'c CatalogEntry> {
    if name.is_empty() {
        issues.push(path, "name", "Name must have at least 1 character");
        return None;
    }

    let entry = catalog.find(name);
    if entry.is_none() {
        issues.push(
            path,
            "name",
            format!(
                "Invalid enchantment name '{}'. Valid values: {}",
                name,
                catalog.display_names().join(", ")
            ),
        );
    }
    entry
}

fn check_level(number: &Number, path: &str, issues: &mut Issues) -> Option<u32> {
    let value = number.as_f64()?;

    if value.fract() != 0.0 {
        issues.push(path, "lvl", "Expected an integer");
        return None;
    }
    if value <= 0.0 {
        issues.push(path, "lvl", "Level must be a positive integer");
        return None;
    }
    if value > f64::from(u32::MAX) {
        issues.push(path, "lvl", "Level is too large");
        return None;
    }

    Some(value as u32)
}

fn check_level_range(
    lvl: u32,
    name: &str,
    entry: &CatalogEntry,
    path: &str,
    issues: &mut Issues,
) {
    if !entry.levels().contains(&lvl) {
        issues.push(
            path,
            "lvl",
            format!(
                "Invalid level for '{}'. Must be between {} and {}.",
                name, entry.min_lvl, entry.max_lvl
            ),
        );
    }
}

fn check_price(price: f64, path: &str, issues: &mut Issues) -> bool {
    let message = if price.is_nan() || price <= 0.0 {
        "Price must be a positive number"
    } else if price < MIN_PRICE {
        "Price must be at least 1"
    } else if price > MAX_PRICE {
        "Price must be at most 64"
    } else {
        return true;
    };
    issues.push(path, "price", message);
    false
}
