//! Status command handler

use anyhow::Result;

use enchant_core::{Config, EnchantmentStore, FileStorage};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(store: &EnchantmentStore, config: &Config, output: &Output) -> Result<()> {
    let stats = FileStorage::new(&config.data_dir).stats(store.store_name());
    let bootstrap = config.bootstrap_source().map(|source| source.location());
    let modified = stats
        .modified
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string());

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "store_name": store.store_name(),
                    "count": store.len(),
                    "catalog_size": store.catalog().len(),
                    "bootstrap": bootstrap,
                    "sync_enabled": config.sync_enabled,
                    "sync_url": config.sync_url,
                    "storage": {
                        "path": stats.path,
                        "exists": stats.exists,
                        "size": stats.size,
                        "modified": stats.modified
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", store.len());
        }
        OutputFormat::Human => {
            println!("Enchant Status");
            println!("==============");
            println!();
            println!("Store:");
            println!("  Name:         {}", store.store_name());
            println!("  Enchantments: {}", store.len());
            println!("  Catalog:      {} known", store.catalog().len());
            println!();
            println!("Snapshot:");
            println!("  Location: {}", stats.path.display());
            if stats.exists {
                println!("  Size:     {}", stats.size_human());
                if let Some(ref modified) = modified {
                    println!("  Modified: {}", modified);
                }
            } else {
                println!("  (not written yet)");
            }
            println!();
            println!("Bootstrap:");
            println!("  Source: {}", bootstrap.as_deref().unwrap_or("(not set)"));
            println!();
            println!("Sync:");
            println!(
                "  Status: {}",
                if config.sync_enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            if let Some(ref url) = config.sync_url {
                println!("  Server: {}", url);
            }
        }
    }

    Ok(())
}
