//! Enchant CLI
//!
//! Command-line interface for Enchant - enchantment price list management.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use enchant_core::{Config, EnchantmentStore, SortColumn, SortOrder, SortState, StoreEvent};

mod commands;
mod output;
mod prompt;

use output::{Output, OutputFormat};

/// How long a write command waits for the remote mirror to answer
const SYNC_WAIT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "enchant")]
#[command(about = "Enchant - Minecraft enchantment price list")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use a specific config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all enchantments
    #[command(alias = "ls")]
    List {
        /// Column to sort by (name, lvl, price)
        #[arg(short, long, default_value = "name")]
        sort: SortColumn,
        /// Sort descending
        #[arg(short, long)]
        desc: bool,
    },
    /// Show one enchantment
    Show {
        /// Position in the list
        index: usize,
    },
    /// Add an enchantment
    Add {
        /// Catalog id or display name
        name: String,
        /// Level (defaults to the lowest level the catalog allows)
        #[arg(short, long)]
        lvl: Option<u32>,
        /// Price in emeralds
        #[arg(short, long)]
        price: f64,
    },
    /// Replace an enchantment
    Edit {
        /// Position in the list
        index: usize,
        name: String,
        lvl: u32,
        price: f64,
    },
    /// Change some fields of an enchantment
    Set {
        /// Position in the list
        index: usize,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        lvl: Option<u32>,
        #[arg(short, long)]
        price: Option<f64>,
    },
    /// Delete an enchantment
    #[command(alias = "rm")]
    Delete {
        /// Position in the list
        index: usize,
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete every enchantment
    Clear {
        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Write all enchantments to a JSON file
    Export {
        /// Target directory (defaults to the current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// File name (defaults to the store name)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Replace all enchantments with a JSON file ("-" reads stdin)
    Import {
        /// File to import
        source: String,
    },
    /// List known enchantments and their levels
    Catalog,
    /// Show status (record count, storage, sync)
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, store_name, bootstrap_url, sync_url, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    let mut store = EnchantmentStore::open_with_config(&config)?;
    // Subscribe first so bootstrap saves and snapshot problems are reported too
    let mut events = store.subscribe();
    store.initialize(config.bootstrap_source().as_ref()).await;

    let result = match cli.command {
        Commands::List { sort, desc } => {
            let order = if desc { SortOrder::Desc } else { SortOrder::Asc };
            let state = SortState {
                column: sort,
                order,
            };
            commands::enchantment::list(&store, state, &output)
        }
        Commands::Show { index } => commands::enchantment::show(&store, index, &output),
        Commands::Add { name, lvl, price } => {
            commands::enchantment::add(&mut store, name, lvl, price, &output)
        }
        Commands::Edit {
            index,
            name,
            lvl,
            price,
        } => commands::enchantment::edit(&mut store, index, name, lvl, price, &output),
        Commands::Set {
            index,
            name,
            lvl,
            price,
        } => commands::enchantment::set(&mut store, index, name, lvl, price, &output),
        Commands::Delete { index, yes } => {
            commands::enchantment::delete(&mut store, index, yes, &output)
        }
        Commands::Clear { yes } => commands::enchantment::clear(&mut store, yes, &output),
        Commands::Export { dir, name } => commands::transfer::export(&store, dir, name, &output),
        Commands::Import { source } => commands::transfer::import(&mut store, source, &output).await,
        Commands::Catalog => commands::catalog::list(store.catalog(), &output),
        Commands::Status => commands::status::show(&store, &config, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    };

    report_events(&mut events, store.mirror().is_some(), &output).await;

    result
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize stderr logging
///
/// `RUST_LOG` wins unless `--verbose` is given.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let default_filter = format!("enchant_core={},enchant_cli={}", level, level);

    let env_filter = if verbose {
        EnvFilter::new(default_filter)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    };

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Surface persistence and sync problems, silently handles success
///
/// When a mirror is configured and the command saved something, waits
/// (bounded) for the push so it isn't cut off when the process exits.
async fn report_events(
    events: &mut UnboundedReceiver<StoreEvent>,
    has_mirror: bool,
    output: &Output,
) {
    let mut pending_sync = false;

    loop {
        let event = if pending_sync {
            match tokio::time::timeout(SYNC_WAIT, events.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(_) => {
                    if !output.is_quiet() {
                        eprintln!("⚠ Remote sync timed out");
                    }
                    break;
                }
            }
        } else {
            match events.try_recv() {
                Ok(event) => event,
                Err(_) => break,
            }
        };

        match event {
            StoreEvent::Persisted { key } => {
                debug!("Saved snapshot '{}'", key);
                pending_sync = has_mirror;
            }
            StoreEvent::PersistFailed {
                key,
                error,
                suggestion,
            } => {
                pending_sync = has_mirror;
                if !output.is_quiet() {
                    eprintln!("⚠ Changes not saved to '{}': {}", key, error);
                    if let Some(suggestion) = suggestion {
                        eprintln!("  {}", suggestion);
                    }
                }
            }
            StoreEvent::Synced { url } => {
                debug!("Synced to {}", url);
                pending_sync = false;
            }
            StoreEvent::SyncFailed { error, .. } => {
                if !output.is_quiet() {
                    eprintln!("⚠ Remote sync failed: {}", error);
                }
                pending_sync = false;
            }
        }
    }
}
