mod commands;
mod output;

use clap::{Parser, Subcommand};
use cloudscope_cloud::ResourceKind;
use cloudscope_config::{Config, ConfigError};
use commands::ResourceArgs;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "csp")]
#[command(about = "Discover and manage VMs and VPCs across AWS, Azure and GCP", long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "CLOUDSCOPE_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List, refresh or operate on virtual machines
    Vm(ResourceArgs),
    /// List, refresh or operate on VPCs, VNets and VPC networks
    Vpc(ResourceArgs),
    /// Rediscover VMs, then VPCs, and save both inventories
    Refresh,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Commands::Vm(args) => {
            commands::resource::handle(ResourceKind::Vm, &args, &load_config()?).await
        }
        Commands::Vpc(args) => {
            commands::resource::handle(ResourceKind::Vpc, &args, &load_config()?).await
        }
        Commands::Refresh => commands::refresh::handle(&load_config()?).await,
        Commands::Version => {
            println!("cloudscope {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Log to stderr; RUST_LOG applies unless `--log-level` is given
fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Listing works from the inventory alone, so a missing config file is not fatal
fn load_config() -> anyhow::Result<Config> {
    match Config::discover() {
        Ok(config) => Ok(config),
        Err(ConfigError::ConfigFileNotFound) => {
            tracing::debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e.into()),
    }
}
