//! Command-line interface.
//!
//! Unified CLI for Guardhouse operations.

pub mod commands;

use crate::core::config::ConfigOverrides;
use clap::{Parser, Subcommand};

/// Guardhouse - per-user guard token service.
#[derive(Parser, Debug)]
#[command(name = "guardhouse")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path.
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Redis address (host:port), overriding the config file.
    #[arg(long, global = true)]
    pub redis_address: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Overrides taken from global flags.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            log_level: self.log_level.clone(),
            http_bind: None,
            redis_address: self.redis_address.clone(),
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server.
    Start(commands::StartArgs),
    /// Configuration operations.
    Config(commands::ConfigArgs),
    /// Issue, refresh or revoke a guard directly against the store.
    Guard(commands::GuardArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_with_overrides() {
        let cli = Cli::try_parse_from([
            "guardhouse",
            "--config",
            "g.toml",
            "--log-level",
            "debug",
            "start",
            "--bind",
            "127.0.0.1:9000",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some("g.toml"));
        assert_eq!(cli.overrides().log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Start(args) => assert_eq!(args.bind.as_deref(), Some("127.0.0.1:9000")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn refresh_requires_guard() {
        assert!(Cli::try_parse_from(["guardhouse", "guard", "refresh", "--user", "1"]).is_err());
        assert!(Cli::try_parse_from([
            "guardhouse",
            "guard",
            "refresh",
            "--user",
            "1",
            "--guard",
            "9296522e-cbd1-45ec-bbc9-1e6c1134bd73",
        ])
        .is_ok());
    }
}
