//! Table sorting
//!
//! Sorting is a view concern: rows carry their store index so a sorted
//! listing can still address the right record.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::models::Enchantment;

/// Column to sort by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Name,
    Level,
    Price,
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "lvl" | "level" => Ok(Self::Level),
            "price" => Ok(Self::Price),
            other => Err(format!(
                "unknown column '{}' (expected name, lvl or price)",
                other
            )),
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Name => "name",
            Self::Level => "lvl",
            Self::Price => "price",
        };
        f.write_str(name)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggle(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Current sort of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub column: SortColumn,
    pub order: SortOrder,
}

impl SortState {
    /// Clicking the active column flips the order; a new column starts ascending
    pub fn select(&mut self, column: SortColumn) {
        if self.column == column {
            self.order = self.order.toggle();
        } else {
            self.column = column;
            self.order = SortOrder::Asc;
        }
    }
}

/// Sort `(store index, record)` rows in place
///
/// Names compare case-insensitively first; numbers compare numerically.
/// The sort is stable, so ties keep store order.
pub fn sort_enchantments(rows: &mut [(usize, Enchantment)], state: SortState) {
    rows.sort_by(|(_, a), (_, b)| {
        let ordering = compare(a, b, state.column);
        match state.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn compare(a: &Enchantment, b: &Enchantment, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Name => a
            .name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name)),
        SortColumn::Level => a.lvl.cmp(&b.lvl),
        SortColumn::Price => a.price.total_cmp(&b.price),
    }
}
