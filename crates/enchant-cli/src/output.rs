//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;
use serde_json::json;

use enchant_core::{CatalogEntry, Enchantment};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single enchantment with its position
    pub fn print_enchantment(&self, index: usize, record: &Enchantment) {
        match self.format {
            OutputFormat::Human => {
                println!("Index: {}", index);
                println!("Name:  {}", record.name);
                println!("Level: {}", record.lvl);
                println!("Price: {}", format_price(record.price));
            }
            OutputFormat::Json => {
                print_json(&row_json(index, record));
            }
            OutputFormat::Quiet => {
                println!("{}", index);
            }
        }
    }

    /// Print `(store index, record)` rows in the given order
    pub fn print_enchantments(&self, rows: &[(usize, Enchantment)]) {
        match self.format {
            OutputFormat::Human => {
                if rows.is_empty() {
                    println!("No enchantments found.");
                    return;
                }
                println!("{:>4}  {:<24}  {:>3}  {:>6}", "#", "Name", "Lvl", "Price");
                for (index, record) in rows {
                    println!(
                        "{:>4}  {:<24}  {:>3}  {:>6}",
                        index,
                        truncate(&record.name, 24),
                        record.lvl,
                        format_price(record.price)
                    );
                }
                println!("\n{} enchantment(s)", rows.len());
            }
            OutputFormat::Json => {
                let json_rows: Vec<_> = rows
                    .iter()
                    .map(|(index, record)| row_json(*index, record))
                    .collect();
                print_json(&json_rows);
            }
            OutputFormat::Quiet => {
                for (index, _) in rows {
                    println!("{}", index);
                }
            }
        }
    }

    /// Print the catalog
    pub fn print_catalog(&self, entries: &[CatalogEntry]) {
        match self.format {
            OutputFormat::Human => {
                if entries.is_empty() {
                    println!("The catalog is empty.");
                    return;
                }
                for entry in entries {
                    let levels = if entry.min_lvl == entry.max_lvl {
                        entry.min_lvl.to_string()
                    } else {
                        format!("{}-{}", entry.min_lvl, entry.max_lvl)
                    };
                    println!("{:<24} {:<24} {}", entry.name, entry.id, levels);
                }
                println!("\n{} enchantment(s)", entries.len());
            }
            OutputFormat::Json => {
                print_json(&entries);
            }
            OutputFormat::Quiet => {
                for entry in entries {
                    println!("{}", entry.id);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!("{}", json!({"status": "success", "message": message}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn row_json(index: usize, record: &Enchantment) -> serde_json::Value {
    json!({
        "index": index,
        "name": record.name,
        "lvl": record.lvl,
        "price": record.price
    })
}

/// Pretty-print any serializable value as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Failed to format output: {}", e),
    }
}

/// Whole prices print without a fraction
fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{:.0}", price)
    } else {
        format!("{:.2}", price)
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
