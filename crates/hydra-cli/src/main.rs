use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use hydra_core::HydraConfig;
use hydra_state::{AppRepository, RedbBackend};
use tracing::{debug, warn};

mod commands;

const DEFAULT_CONFIG: &str = "hydra.toml";

#[derive(Parser)]
#[command(
    name = "hydra",
    about = "Hydra — per-app strategy schedules and server fleet status",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to hydra.toml (default: ./hydra.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a hydra.toml scaffold
    Init {
        #[arg(short, long, default_value = "my-app")]
        app_id: String,
    },
    #[command(flatten)]
    Store(StoreCommand),
}

/// Commands that run against the record store.
#[derive(Subcommand)]
enum StoreCommand {
    /// Insert a new app record from a JSON file
    Create {
        file: PathBuf,
    },
    /// Show one app record, compacting past schedule entries
    Get {
        app_id: String,
        /// Show the record exactly as stored, without compaction
        #[arg(long)]
        raw: bool,
    },
    /// Show which strategies and server states are in effect now, and
    /// which changes are scheduled
    Status {
        app_id: String,
    },
    /// Show every app record
    List {
        #[arg(long)]
        raw: bool,
    },
    /// Merge a partial app record from a JSON file
    Update {
        file: PathBuf,
    },
    /// Delete an app record
    Remove {
        app_id: String,
    },
    /// Compact every stored record now
    Compact,
    /// Build a status report from probe results and merge it.
    ///
    /// Servers come from [reporter] in hydra.toml. The probe file maps each
    /// server's public address to {"state", "cpuLoad", "memLoad"}; servers
    /// without a probe result are reported UNAVAILABLE.
    Report {
        /// JSON file with probe results
        #[arg(short, long)]
        probes: PathBuf,
        /// Print the report without applying it
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(config.log_filter()))?,
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { app_id } => commands::records::init(&app_id),
        Commands::Store(command) => run_store_command(command, &config).await,
    }
}

async fn run_store_command(command: StoreCommand, config: &HydraConfig) -> anyhow::Result<()> {
    let repo = open_repository(config)?;

    let result = match command {
        StoreCommand::Create { file } => commands::records::create(&repo, &file).await,
        StoreCommand::Get { app_id, raw } => commands::records::get(&repo, &app_id, raw).await,
        StoreCommand::Status { app_id } => commands::records::status(&repo, &app_id).await,
        StoreCommand::List { raw } => commands::records::list(&repo, raw).await,
        StoreCommand::Update { file } => commands::records::update(&repo, &file).await,
        StoreCommand::Remove { app_id } => commands::records::remove(&repo, &app_id).await,
        StoreCommand::Compact => commands::records::compact(&repo).await,
        StoreCommand::Report { probes, dry_run } => {
            commands::report::report(&repo, config, &probes, dry_run).await
        }
    };

    repo.flush_write_backs().await;
    result
}

fn load_config(path: Option<&Path>) -> anyhow::Result<HydraConfig> {
    match path {
        Some(path) => HydraConfig::from_file(path),
        None if Path::new(DEFAULT_CONFIG).exists() => HydraConfig::from_file(Path::new(DEFAULT_CONFIG)),
        None => Ok(HydraConfig::default()),
    }
}

fn open_repository(config: &HydraConfig) -> anyhow::Result<AppRepository> {
    let backend = match &config.store.path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            debug!(path = ?path, "opening record store");
            RedbBackend::open(path)?
        }
        None => {
            warn!("no [store] path configured, using an in-memory store");
            RedbBackend::open_in_memory()?
        }
    };
    Ok(AppRepository::new(Arc::new(backend)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_parses_as_its_own_command() {
        let cli = Cli::try_parse_from(["hydra", "init", "--app-id", "shop"]).unwrap();
        assert!(matches!(cli.command, Commands::Init { ref app_id } if app_id == "shop"));
    }

    #[test]
    fn store_commands_stay_top_level() {
        let cli = Cli::try_parse_from(["hydra", "status", "shop"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Store(StoreCommand::Status { ref app_id }) if app_id == "shop"
        ));

        let cli = Cli::try_parse_from(["hydra", "get", "shop", "--raw"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Store(StoreCommand::Get { raw: true, .. })
        ));
    }
}
