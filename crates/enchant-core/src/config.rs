//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/enchant/config.toml)
//! 3. Environment variables (ENCHANT_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::remote::{BootstrapSource, RemoteMirror};

/// Environment variable prefix
const ENV_PREFIX: &str = "ENCHANT";

/// Default storage key and bootstrap document name
pub const DEFAULT_STORE_NAME: &str = "enchantments";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the snapshot files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Storage key of the snapshot
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Base URL for the bootstrap document (optional)
    #[serde(default)]
    pub bootstrap_url: Option<String>,

    /// Logical name of the bootstrap document, fetched as `<name>.json`
    #[serde(default = "default_store_name")]
    pub bootstrap_name: String,

    /// Remote mirror URL (optional)
    #[serde(default)]
    pub sync_url: Option<String>,

    /// Whether the remote mirror is used
    #[serde(default)]
    pub sync_enabled: bool,

    /// Custom catalog file; the bundled catalog is used when unset
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store_name: default_store_name(),
            bootstrap_url: None,
            bootstrap_name: default_store_name(),
            sync_url: None,
            sync_enabled: false,
            catalog_path: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (ENCHANT_DATA_DIR, ENCHANT_SYNC_URL, ...)
    /// 2. Config file (~/.config/enchant/config.toml or ENCHANT_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit path over the default
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var(format!("{}_DATA_DIR", ENV_PREFIX)) {
            self.data_dir = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var(format!("{}_STORE_NAME", ENV_PREFIX)) {
            if !val.is_empty() {
                self.store_name = val;
            }
        }

        if let Ok(val) = std::env::var(format!("{}_BOOTSTRAP_URL", ENV_PREFIX)) {
            self.bootstrap_url = if val.is_empty() { None } else { Some(val) };
        }

        if let Ok(val) = std::env::var(format!("{}_SYNC_URL", ENV_PREFIX)) {
            self.sync_url = if val.is_empty() { None } else { Some(val) };
        }

        if let Ok(val) = std::env::var(format!("{}_SYNC_ENABLED", ENV_PREFIX)) {
            self.sync_enabled = val.eq_ignore_ascii_case("true") || val == "1";
        }

        if let Ok(val) = std::env::var(format!("{}_CATALOG", ENV_PREFIX)) {
            self.catalog_path = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with ENCHANT_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("enchant")
            .join("config.toml")
    }

    /// Get the path to the snapshot file
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.json", self.store_name))
    }

    /// Bootstrap source, if a bootstrap URL is configured
    pub fn bootstrap_source(&self) -> Option<BootstrapSource> {
        self.bootstrap_url
            .as_ref()
            .map(|url| BootstrapSource::remote(url.clone(), self.bootstrap_name.clone()))
    }

    /// Remote mirror, if sync is enabled and a URL is configured
    pub fn mirror(&self) -> Result<Option<RemoteMirror>> {
        match (&self.sync_url, self.sync_enabled) {
            (Some(url), true) => Ok(Some(
                RemoteMirror::new(url.clone()).context("Failed to set up remote sync")?,
            )),
            _ => Ok(None),
        }
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("enchant")
}

fn default_store_name() -> String {
    DEFAULT_STORE_NAME.to_string()
}
