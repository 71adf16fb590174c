//! Configuration parsing and validation.
//!
//! Guardhouse configuration is loaded from a TOML file with CLI overrides.
//! Numeric policy values are parsed once here; a malformed or non-positive
//! value aborts startup instead of surfacing on a request path.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound on `guards.lifetime_seconds`; keeps expiry arithmetic in range.
pub const MAX_LIFETIME_SECONDS: u64 = u32::MAX as u64;

/// Top-level Guardhouse configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Guard lifecycle policy.
    pub guards: GuardsConfig,

    /// Key-value backend selection and connection settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// HTTP surface.
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Guard lifecycle policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardsConfig {
    /// Lifetime applied on issue and on every refresh, in seconds.
    pub lifetime_seconds: u64,

    /// Maximum number of simultaneously active guards per user.
    pub max_per_user: u32,
}

impl GuardsConfig {
    /// Guard lifetime as a duration.
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_seconds)
    }
}

/// Which key-value backend holds guard records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// A Redis server reached over RESP2.
    Redis,
    /// An in-process map; records vanish with the process.
    Memory,
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::Redis
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redis => write!(f, "redis"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend type.
    #[serde(default)]
    pub backend: StoreBackend,

    /// Redis connection settings (used when `backend = "redis"`).
    #[serde(default)]
    pub redis: RedisStoreConfig,
}

/// Redis connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisStoreConfig {
    /// Server address (host:port).
    #[serde(default = "default_redis_address")]
    pub address: String,

    /// Connection establishment deadline in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Per-command round-trip deadline in milliseconds.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// Logical database selected on connect.
    #[serde(default)]
    pub database: u32,

    /// COUNT hint passed to SCAN.
    #[serde(default = "default_scan_count")]
    pub scan_count: u32,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            address: default_redis_address(),
            connect_timeout_ms: default_connect_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            database: 0,
            scan_count: default_scan_count(),
        }
    }
}

impl RedisStoreConfig {
    /// Connection establishment deadline.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Per-command deadline.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Bind address (e.g., "0.0.0.0:8001").
    #[serde(default = "default_http_bind")]
    pub bind: String,

    /// Header carrying the already-authenticated user id.
    #[serde(default = "default_user_id_header")]
    pub user_id_header: String,

    /// Value of `Access-Control-Allow-Origin`.
    #[serde(default = "default_cors_allowed_origin")]
    pub cors_allowed_origin: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_http_bind(),
            user_id_header: default_user_id_header(),
            cors_allowed_origin: default_cors_allowed_origin(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Text
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

// Default value functions

fn default_redis_address() -> String {
    "127.0.0.1:6379".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    1_000
}

fn default_command_timeout_ms() -> u64 {
    500
}

fn default_scan_count() -> u32 {
    100
}

fn default_http_bind() -> String {
    "0.0.0.0:8001".to_string()
}

fn default_user_id_header() -> String {
    "x-user-id".to_string()
}

fn default_cors_allowed_origin() -> String {
    "*".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).with_context(|| "failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load a file, apply CLI overrides and re-validate the result.
    pub fn load(path: &Path, overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(overrides);
        config
            .validate()
            .context("invalid configuration after CLI overrides")?;
        Ok(config)
    }

    /// Apply CLI overrides to the configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref log_level) = overrides.log_level {
            self.telemetry.log_level = log_level.clone();
        }
        if let Some(ref bind) = overrides.http_bind {
            self.http.bind = bind.clone();
        }
        if let Some(ref address) = overrides.redis_address {
            self.store.redis.address = address.clone();
        }
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<()> {
        self.validate_guards()?;
        self.validate_store()?;
        self.validate_http()?;
        self.validate_telemetry()?;
        Ok(())
    }

    fn validate_guards(&self) -> Result<()> {
        if self.guards.lifetime_seconds == 0 {
            anyhow::bail!("guards.lifetime_seconds must be > 0");
        }
        if self.guards.max_per_user == 0 {
            anyhow::bail!("guards.max_per_user must be > 0");
        }
        if self.guards.lifetime_seconds > MAX_LIFETIME_SECONDS {
            anyhow::bail!(
                "guards.lifetime_seconds is out of range: {}",
                self.guards.lifetime_seconds
            );
        }
        Ok(())
    }

    fn validate_store(&self) -> Result<()> {
        if self.store.backend != StoreBackend::Redis {
            return Ok(());
        }

        let redis = &self.store.redis;
        if redis.address.trim().is_empty() {
            anyhow::bail!("store.redis.address must not be empty");
        }
        if !redis.address.contains(':') {
            anyhow::bail!(
                "store.redis.address must be host:port, got: {}",
                redis.address
            );
        }
        if redis.connect_timeout_ms == 0 {
            anyhow::bail!("store.redis.connect_timeout_ms must be > 0");
        }
        if redis.command_timeout_ms == 0 {
            anyhow::bail!("store.redis.command_timeout_ms must be > 0");
        }
        if redis.scan_count == 0 {
            anyhow::bail!("store.redis.scan_count must be > 0");
        }
        Ok(())
    }

    fn validate_http(&self) -> Result<()> {
        self.http
            .bind
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("http.bind is not a socket address: {}", self.http.bind))?;

        let header = &self.http.user_id_header;
        if header.is_empty()
            || !header
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            anyhow::bail!("http.user_id_header is not a valid header name: {:?}", header);
        }
        Ok(())
    }

    fn validate_telemetry(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "telemetry.log_level must be one of {:?}, got: {}",
                valid_levels,
                self.telemetry.log_level
            );
        }
        Ok(())
    }
}

/// CLI override options that can be applied to configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override log level.
    pub log_level: Option<String>,
    /// Override HTTP bind address.
    pub http_bind: Option<String>,
    /// Override Redis address.
    pub redis_address: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[guards]
lifetime_seconds = 60
max_per_user = 3
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.guards.lifetime(), Duration::from_secs(60));
        assert_eq!(config.guards.max_per_user, 3);
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.store.redis.address, "127.0.0.1:6379");
        assert_eq!(config.http.user_id_header, "x-user-id");
        assert_eq!(config.telemetry.log_format, LogFormat::Text);
    }

    #[test]
    fn non_numeric_quota_is_rejected() {
        let content = r#"
[guards]
lifetime_seconds = 60
max_per_user = "three"
"#;
        assert!(Config::from_toml(content).is_err());
    }

    #[test]
    fn zero_quota_is_rejected() {
        let content = r#"
[guards]
lifetime_seconds = 60
max_per_user = 0
"#;
        let err = Config::from_toml(content).unwrap_err();
        assert!(err.to_string().contains("max_per_user"));
    }

    #[test]
    fn zero_lifetime_is_rejected() {
        let content = r#"
[guards]
lifetime_seconds = 0
max_per_user = 3
"#;
        let err = Config::from_toml(content).unwrap_err();
        assert!(err.to_string().contains("lifetime_seconds"));
    }

    #[test]
    fn memory_backend_skips_redis_checks() {
        let content = r#"
[guards]
lifetime_seconds = 60
max_per_user = 3

[store]
backend = "memory"

[store.redis]
address = ""
"#;
        let config = Config::from_toml(content).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn overrides_apply() {
        let mut config = Config::from_toml(MINIMAL).unwrap();
        config.apply_overrides(&ConfigOverrides {
            log_level: Some("debug".into()),
            http_bind: Some("127.0.0.1:9000".into()),
            redis_address: Some("redis:6380".into()),
        });
        assert_eq!(config.telemetry.log_level, "debug");
        assert_eq!(config.http.bind, "127.0.0.1:9000");
        assert_eq!(config.store.redis.address, "redis:6380");
        assert!(config.validate().is_ok());
    }
}
