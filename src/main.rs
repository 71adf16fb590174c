//! Guardhouse - unified CLI entrypoint.
//!
//! Usage:
//!   guardhouse start --config config/guardhouse.toml
//!   guardhouse config validate --config config/guardhouse.toml
//!   guardhouse config generate --backend memory
//!   guardhouse guard issue --user 42

use anyhow::Result;
use clap::Parser;
use guardhouse::cli::commands::{run_config, run_guard, run_start};
use guardhouse::cli::{Cli, Commands};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let overrides = cli.overrides();

    // Determine config path - use global --config or default
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config/guardhouse.toml"));

    match cli.command {
        Commands::Start(args) => run_start(args, &config_path, overrides).await,
        Commands::Config(args) => run_config(args, &config_path),
        Commands::Guard(args) => run_guard(args, &config_path, overrides).await,
    }
}
