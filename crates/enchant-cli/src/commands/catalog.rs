//! Catalog command handler

use anyhow::Result;

use enchant_core::Catalog;

use crate::output::Output;

/// List known enchantments and their level ranges
pub fn list(catalog: &Catalog, output: &Output) -> Result<()> {
    output.print_catalog(catalog.entries());
    Ok(())
}
