//! Enchantment command handlers

use anyhow::{bail, Context, Result};

use enchant_core::{sort_enchantments, Enchantment, EnchantmentPatch, EnchantmentStore, SortState};

use crate::output::Output;
use crate::prompt::confirm;

/// List all enchantments in the requested order
///
/// Rows keep their store index, so the numbers shown can be passed to
/// `show`, `edit`, `set` and `delete` regardless of the sort.
pub fn list(store: &EnchantmentStore, sort: SortState, output: &Output) -> Result<()> {
    let mut rows: Vec<(usize, Enchantment)> = store.get_all().into_iter().enumerate().collect();
    sort_enchantments(&mut rows, sort);

    output.print_enchantments(&rows);
    Ok(())
}

/// Show a single enchantment
pub fn show(store: &EnchantmentStore, index: usize, output: &Output) -> Result<()> {
    let record = get_record(store, index)?;
    output.print_enchantment(index, &record);
    Ok(())
}

/// Add an enchantment
///
/// Without `lvl`, the lowest level the catalog allows for `name` is used.
pub fn add(
    store: &mut EnchantmentStore,
    name: String,
    lvl: Option<u32>,
    price: f64,
    output: &Output,
) -> Result<()> {
    let lvl = lvl.unwrap_or_else(|| default_level(store, &name));

    let record = store
        .add(Enchantment::new(name, lvl, price))
        .context("Invalid enchantment")?;
    let index = store.len() - 1;

    output.success(&format!("Added {} {} at index {}", record.name, record.lvl, index));
    output.print_enchantment(index, &record);

    Ok(())
}

/// Replace an enchantment
pub fn edit(
    store: &mut EnchantmentStore,
    index: usize,
    name: String,
    lvl: u32,
    price: f64,
    output: &Output,
) -> Result<()> {
    let updated = store
        .update(index, Enchantment::new(name, lvl, price))
        .context("Invalid enchantment")?;
    if !updated {
        bail!("No enchantment at index {}", index);
    }

    output.success(&format!("Updated enchantment {}", index));
    print_current(store, index, output)
}

/// Change only the given fields of an enchantment
pub fn set(
    store: &mut EnchantmentStore,
    index: usize,
    name: Option<String>,
    lvl: Option<u32>,
    price: Option<f64>,
    output: &Output,
) -> Result<()> {
    let patch = EnchantmentPatch { name, lvl, price };
    if patch.is_empty() {
        bail!("Nothing to change. Use --name, --lvl or --price.");
    }

    let updated = store
        .update_field(index, &patch)
        .context("Invalid enchantment")?;
    if !updated {
        bail!("No enchantment at index {}", index);
    }

    output.success(&format!("Updated enchantment {}", index));
    print_current(store, index, output)
}

/// Delete an enchantment
pub fn delete(store: &mut EnchantmentStore, index: usize, yes: bool, output: &Output) -> Result<()> {
    let record = get_record(store, index)?;

    if output.should_prompt() && !yes {
        println!("Delete enchantment: {} {}", record.name, record.lvl);
        if !confirm("Are you sure?")? {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    if !store.delete(index) {
        bail!("No enchantment at index {}", index);
    }

    output.success(&format!("Deleted {} {}", record.name, record.lvl));

    Ok(())
}

/// Delete every enchantment
pub fn clear(store: &mut EnchantmentStore, yes: bool, output: &Output) -> Result<()> {
    let count = store.len();

    if output.should_prompt() && !yes {
        println!("Delete all {} enchantment(s)", count);
        if !confirm("Are you sure?")? {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    store.clear();
    output.success(&format!("Deleted {} enchantment(s)", count));

    Ok(())
}

fn get_record(store: &EnchantmentStore, index: usize) -> Result<Enchantment> {
    store
        .get_by_id(index)
        .ok_or_else(|| anyhow::anyhow!("No enchantment at index {}", index))
}

fn print_current(store: &EnchantmentStore, index: usize, output: &Output) -> Result<()> {
    let record = get_record(store, index)?;
    output.print_enchantment(index, &record);
    Ok(())
}

fn default_level(store: &EnchantmentStore, name: &str) -> u32 {
    store
        .catalog()
        .levels(name)
        .map(|levels| *levels.start())
        .unwrap_or(1)
}
