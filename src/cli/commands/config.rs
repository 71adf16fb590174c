//! Config command implementation.

use crate::core::config::{Config, StoreBackend};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::Path;

/// Configuration operations.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate the configuration file.
    Validate,
    /// Print the configuration with defaults filled in.
    Show {
        /// Output format (toml, json).
        #[arg(long, default_value = "toml")]
        format: String,
    },
    /// Generate a configuration template.
    Generate {
        /// Output file path.
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
        /// Store backend (redis, memory).
        #[arg(long, default_value = "redis")]
        backend: String,
    },
}

/// Run the config command.
pub fn run_config(args: ConfigArgs, config_path: &Path) -> Result<()> {
    match args.command {
        ConfigCommand::Validate => validate_config(config_path),
        ConfigCommand::Show { format } => show_config(config_path, &format),
        ConfigCommand::Generate { output, backend } => {
            generate_config(output.as_deref(), &backend)
        }
    }
}

fn validate_config(path: &Path) -> Result<()> {
    let config = Config::from_file(path)?;

    println!("✓ Configuration is valid: {}", path.display());
    println!(
        "  guards: lifetime {}s, max {} per user",
        config.guards.lifetime_seconds, config.guards.max_per_user
    );
    match config.store.backend {
        StoreBackend::Redis => println!("  store: redis at {}", config.store.redis.address),
        StoreBackend::Memory => {
            println!("  store: memory");
            println!("  ⚠ Warning: guards do not survive restarts with the memory backend");
        }
    }
    println!("  http: {}", config.http.bind);
    Ok(())
}

fn show_config(path: &Path, format: &str) -> Result<()> {
    let config = Config::from_file(path)?;

    let rendered = match format {
        "json" => serde_json::to_string_pretty(&config)?,
        "toml" => toml::to_string_pretty(&config).context("failed to render config")?,
        other => anyhow::bail!("unknown format: {} (expected toml or json)", other),
    };
    println!("{}", rendered);
    Ok(())
}

fn generate_config(output: Option<&Path>, backend: &str) -> Result<()> {
    let template = match backend {
        "redis" => generate_redis_template(),
        "memory" => generate_memory_template(),
        other => anyhow::bail!("unknown backend: {} (expected redis or memory)", other),
    };

    match output {
        Some(path) => {
            std::fs::write(path, &template)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Generated {} config template: {:?}", backend, path);
        }
        None => {
            println!("{}", template);
        }
    }

    Ok(())
}

fn generate_redis_template() -> String {
    r#"# Guardhouse Configuration

[guards]
lifetime_seconds = 60
max_per_user = 3

[store]
backend = "redis"

[store.redis]
address = "127.0.0.1:6379"
connect_timeout_ms = 1000
command_timeout_ms = 500
database = 0
scan_count = 100

[http]
bind = "0.0.0.0:8001"
user_id_header = "x-user-id"
cors_allowed_origin = "*"

[telemetry]
log_level = "info"
log_format = "json"
"#
    .to_string()
}

fn generate_memory_template() -> String {
    r#"# Guardhouse Development Configuration

[guards]
lifetime_seconds = 60
max_per_user = 3

[store]
backend = "memory"

[http]
bind = "127.0.0.1:8001"

[telemetry]
log_level = "debug"
log_format = "text"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_parse_and_validate() {
        let redis = Config::from_toml(&generate_redis_template()).unwrap();
        assert_eq!(redis.store.backend, StoreBackend::Redis);

        let memory = Config::from_toml(&generate_memory_template()).unwrap();
        assert_eq!(memory.store.backend, StoreBackend::Memory);
        assert_eq!(memory.telemetry.log_level, "debug");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(generate_config(None, "etcd").is_err());
    }
}
