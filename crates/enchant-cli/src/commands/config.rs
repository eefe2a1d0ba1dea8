//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use enchant_core::storage::check_key;
use enchant_core::Config;

use crate::output::{Output, OutputFormat};

const VALID_KEYS: &str =
    "data_dir, store_name, bootstrap_url, bootstrap_name, sync_url, sync_enabled, catalog_path";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "store_name": config.store_name,
                    "bootstrap_url": config.bootstrap_url,
                    "bootstrap_name": config.bootstrap_name,
                    "sync_url": config.sync_url,
                    "sync_enabled": config.sync_enabled,
                    "catalog_path": config.catalog_path
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:       {}", config.data_dir.display());
            println!("  store_name:     {}", config.store_name);
            println!(
                "  bootstrap_url:  {}",
                config.bootstrap_url.as_deref().unwrap_or("(not set)")
            );
            println!("  bootstrap_name: {}", config.bootstrap_name);
            println!(
                "  sync_url:       {}",
                config.sync_url.as_deref().unwrap_or("(not set)")
            );
            println!("  sync_enabled:   {}", config.sync_enabled);
            println!(
                "  catalog_path:   {}",
                config
                    .catalog_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(bundled)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Set one key on `config`; "" or "none" clears optional values
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "store_name" => {
            check_key(value).context("store_name must be a plain file name")?;
            config.store_name = value.to_string();
        }
        "bootstrap_url" => {
            config.bootstrap_url = optional(value);
        }
        "bootstrap_name" => {
            if value.is_empty() {
                bail!("bootstrap_name can't be empty");
            }
            config.bootstrap_name = value.to_string();
        }
        "sync_url" => {
            config.sync_url = optional(value);
        }
        "sync_enabled" => {
            config.sync_enabled = value
                .parse()
                .context("Invalid value for sync_enabled. Use 'true' or 'false'.")?;
        }
        "catalog_path" => {
            config.catalog_path = optional(value).map(PathBuf::from);
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                VALID_KEYS
            );
        }
    }
    Ok(())
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}
