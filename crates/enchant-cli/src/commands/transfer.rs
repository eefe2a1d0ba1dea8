//! Export and import command handlers

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

use enchant_core::EnchantmentStore;

use crate::output::Output;

/// Write all enchantments to `<dir>/<name>.json`
pub fn export(
    store: &EnchantmentStore,
    dir: Option<PathBuf>,
    name: Option<String>,
    output: &Output,
) -> Result<()> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let name = name.unwrap_or_else(|| store.store_name().to_string());

    let path = store.download_json(&dir, &name)?;

    if output.is_quiet() {
        println!("{}", path.display());
    } else {
        output.success(&format!(
            "Exported {} enchantment(s) to {}",
            store.len(),
            path.display()
        ));
    }

    Ok(())
}

/// Replace all enchantments with a JSON file, or stdin for "-"
///
/// Nothing changes unless the whole file is valid.
pub async fn import(store: &mut EnchantmentStore, source: String, output: &Output) -> Result<()> {
    let records = if source == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read stdin")?;
        store.load_json_text(&text)?
    } else {
        store.upload_json(Some(Path::new(&source))).await?
    };

    output.success(&format!("Imported {} enchantment(s)", records.len()));

    Ok(())
}
