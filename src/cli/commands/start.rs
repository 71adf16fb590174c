//! Start command implementation.

use crate::core::config::{Config, ConfigOverrides, TelemetryConfig};
use crate::core::runtime::Runtime;
use anyhow::{Context, Result};
use clap::Args;
use std::path::Path;

/// Start the HTTP server.
#[derive(Args, Debug, Default)]
pub struct StartArgs {
    /// HTTP bind address, overriding the config file.
    #[arg(long)]
    pub bind: Option<String>,
}

/// Initialize tracing subscriber if the telemetry feature is enabled.
///
/// `RUST_LOG` wins over the configured level. Safe to call more than once.
#[cfg(feature = "telemetry")]
pub fn init_tracing(telemetry: &TelemetryConfig) {
    use crate::core::config::LogFormat;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&telemetry.log_level));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match telemetry.log_format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).try_init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).try_init(),
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(not(feature = "telemetry"))]
pub fn init_tracing(_telemetry: &TelemetryConfig) {}

/// Run the start command with the given config path.
pub async fn run_start(
    args: StartArgs,
    config_path: &Path,
    mut overrides: ConfigOverrides,
) -> Result<()> {
    overrides.http_bind = args.bind;

    let config = Config::load(config_path, &overrides)
        .with_context(|| format!("failed to load config from {:?}", config_path))?;
    init_tracing(&config.telemetry);

    let mut runtime = Runtime::new(config)?;
    runtime.run().await
}
