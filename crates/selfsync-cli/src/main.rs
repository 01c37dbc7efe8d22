//! SelfSync - bidirectional vault synchronization client
//!
//! Mirrors a local directory of notes against a sync server: local changes
//! since the last sync are uploaded, and the server's changes are applied
//! back to the vault.

mod display;
mod json_output;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use display::{print_report, print_snapshot, ConsoleStatus};
use json_output::SyncReportJson;
use selfsync_config::{Config, ConfigLoader, LoggingConfig};
use selfsync_network::HttpTransport;
use selfsync_sync::{FsVault, SnapshotStore, SyncCoordinator, SyncOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// SelfSync - bidirectional vault synchronization client
#[derive(Parser)]
#[command(
    name = "selfsync",
    version = env!("CARGO_PKG_VERSION"),
    about = "Bidirectional vault synchronization client",
    long_about = "SelfSync mirrors a local vault against a sync server.\n\
                  Local additions, edits and deletions since the last sync are uploaded,\n\
                  and the server's counter-changes are applied back to the vault."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode - minimal output
    #[arg(short, long)]
    quiet: bool,

    /// Verbose mode - detailed output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync transaction
    Sync {
        /// Vault root directory
        #[arg(long)]
        root: Option<PathBuf>,
        /// Sync endpoint URL
        #[arg(long)]
        url: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the last committed sync
    Status {
        /// Vault root directory
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Log vault change notifications until interrupted
    Watch {
        /// Vault root directory
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
        /// Write the configuration to a file instead of printing it
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?;

    init_logging(cli.debug, cli.quiet, cli.verbose, &config.logging)?;

    info!("SelfSync v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Sync { root, url, json } => {
            let config = with_overrides(config, root, url)?;
            sync_command(&config, cli.quiet, json).await?;
        }
        Commands::Status { root } => {
            let config = with_overrides(config, root, None)?;
            status_command(&config).await?;
        }
        Commands::Watch { root } => {
            let config = with_overrides(config, root, None)?;
            watch_command(&config, cli.quiet).await?;
        }
        Commands::Config { default, write } => {
            let config = if default { Config::default() } else { config };
            config_command(&config, write.as_deref())?;
        }
    }

    Ok(())
}

fn init_logging(debug: bool, quiet: bool, verbose: bool, logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let flag_level = if debug {
        Some("debug")
    } else if verbose {
        Some("info")
    } else if quiet {
        Some("error")
    } else {
        None
    };

    let filter = match flag_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&logging.level))?,
    };

    // stdout carries command output such as `sync --json`
    let builder = fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

fn with_overrides(mut config: Config, root: Option<PathBuf>, url: Option<String>) -> Result<Config> {
    if let Some(root) = root {
        config.vault.root = root;
    }
    if let Some(url) = url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("Server URL must start with http:// or https://, got '{}'", url);
        }
        config.server.url = url;
    }
    if !config.vault.root.is_dir() {
        bail!("Vault root '{}' is not a directory", config.vault.root.display());
    }
    Ok(config)
}

async fn open_coordinator(config: &Config, status: Arc<ConsoleStatus>) -> Result<SyncCoordinator> {
    let host = Arc::new(FsVault::from_config(config));
    let transport = Arc::new(HttpTransport::from_config(config)?);

    let coordinator = SyncCoordinator::new(host, transport, config.vault_name())
        .with_status(status)
        .with_store(SnapshotStore::new(config.snapshot_path()))
        .load_snapshot()
        .await?;
    Ok(coordinator)
}

async fn sync_command(config: &Config, quiet: bool, json: bool) -> Result<()> {
    info!("Starting sync of {}", config.vault.root.display());
    let quiet = quiet || json;

    if !quiet {
        println!(
            "{} Syncing {} with {}",
            style("⟲").blue().bold(),
            style(config.vault.root.display()).cyan(),
            style(&config.server.url).cyan()
        );
    }

    let status = Arc::new(ConsoleStatus::new(quiet));
    let coordinator = open_coordinator(config, status).await?;

    match coordinator.trigger().await? {
        SyncOutcome::Completed(report) => {
            if json {
                let output = SyncReportJson::new(&report, coordinator.vault_name());
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else if !quiet {
                print_report(&report);
            }
        }
        SyncOutcome::Skipped { phase } => {
            println!(
                "{} A sync is already {}; nothing to do",
                style("ℹ").yellow(),
                phase
            );
        }
    }

    Ok(())
}

async fn status_command(config: &Config) -> Result<()> {
    let store = SnapshotStore::new(config.snapshot_path());
    let snapshot = store.load().await?;
    print_snapshot(&config.vault_name(), &snapshot);
    Ok(())
}

async fn watch_command(config: &Config, quiet: bool) -> Result<()> {
    let status = Arc::new(ConsoleStatus::new(true));
    let coordinator = open_coordinator(config, status).await?;
    let mut watcher = FsVault::from_config(config).watch()?;

    if !quiet {
        println!(
            "{} Watching {} (Ctrl+C to stop)",
            style("👁").blue().bold(),
            style(config.vault.root.display()).cyan()
        );
    }

    loop {
        tokio::select! {
            event = watcher.next_event() => match event {
                Some(event) => {
                    coordinator.observe(&event);
                    if !quiet {
                        println!("  {}", style(format!("{:?}", event)).dim());
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    info!("Stopped watching");
    Ok(())
}

fn config_command(config: &Config, write: Option<&Path>) -> Result<()> {
    if let Some(path) = write {
        ConfigLoader::save_to_file(config, path)?;
        println!(
            "{} Wrote configuration to {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
        return Ok(());
    }

    println!("{} Configuration:", style("⚙").blue().bold());
    print!("{}", ConfigLoader::render(config, Path::new("config.yaml"))?);
    Ok(())
}
