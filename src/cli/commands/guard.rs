//! Guard command implementation.
//!
//! Runs a single lifecycle operation against the configured store, without
//! going through HTTP.

use super::start::init_tracing;
use crate::core::config::{Config, ConfigOverrides};
use crate::core::time::SystemClock;
use crate::guard::{GuardManager, GuardPolicy, UuidGenerator};
use crate::http::handlers::is_valid_user_id;
use crate::store::open_store;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::Path;
use std::sync::Arc;

/// Guard operations.
#[derive(Args, Debug)]
pub struct GuardArgs {
    #[command(subcommand)]
    pub command: GuardCommand,
}

/// Guard subcommands.
#[derive(Subcommand, Debug)]
pub enum GuardCommand {
    /// Issue a new guard.
    Issue {
        /// Owning user id.
        #[arg(long)]
        user: String,
    },
    /// Refresh an existing guard.
    Refresh {
        /// Owning user id.
        #[arg(long)]
        user: String,
        /// Guard id.
        #[arg(long)]
        guard: String,
    },
    /// Revoke an existing guard.
    Revoke {
        /// Owning user id.
        #[arg(long)]
        user: String,
        /// Guard id.
        #[arg(long)]
        guard: String,
    },
}

impl GuardCommand {
    fn user(&self) -> &str {
        match self {
            Self::Issue { user } | Self::Refresh { user, .. } | Self::Revoke { user, .. } => user,
        }
    }
}

/// Run the guard command.
pub async fn run_guard(
    args: GuardArgs,
    config_path: &Path,
    overrides: ConfigOverrides,
) -> Result<()> {
    let config = Config::load(config_path, &overrides)
        .with_context(|| format!("failed to load config from {:?}", config_path))?;
    init_tracing(&config.telemetry);

    let user = args.command.user();
    if !is_valid_user_id(user) {
        anyhow::bail!("invalid user id: {:?}", user);
    }

    let clock = Arc::new(SystemClock);
    let store = open_store(&config.store, clock.clone())
        .await
        .context("failed to open guard store")?;
    let manager = GuardManager::new(
        store.clone(),
        clock,
        Arc::new(UuidGenerator),
        GuardPolicy::from(&config.guards),
    );

    let result = match &args.command {
        GuardCommand::Issue { user } => manager.issue(user).await,
        GuardCommand::Refresh { user, guard } => manager.refresh(user, guard).await,
        GuardCommand::Revoke { user, guard } => manager.revoke(user, guard).await,
    };

    if let Err(e) = store.close().await {
        tracing::warn!(error = %e, "failed to close guard store");
    }

    match result {
        Ok(guard_id) => {
            println!("{}", serde_json::json!({ "guardId": guard_id }));
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("{} ({})", e, e.code())),
    }
}
