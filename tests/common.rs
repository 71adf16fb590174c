//! Common test utilities.
//!
//! This module contains shared helpers for integration tests.
//! Import with `mod common;` in test files.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use guardhouse::core::config::Config;
use guardhouse::core::time::ManualClock;
use guardhouse::guard::{GuardManager, GuardPolicy, SequentialGenerator};
use guardhouse::store::MemoryGuardStore;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;

/// Fixed start instant for deterministic clocks.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// Write arbitrary content to a temp config file.
pub fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file
}

/// Create a minimal valid configuration file using the memory backend.
pub fn create_memory_config() -> NamedTempFile {
    create_memory_config_with(60, 3)
}

/// Create a memory-backed configuration with custom guard settings.
///
/// The HTTP listener binds an ephemeral port.
pub fn create_memory_config_with(lifetime_seconds: u64, max_per_user: u32) -> NamedTempFile {
    write_config(&format!(
        r#"
[guards]
lifetime_seconds = {}
max_per_user = {}

[store]
backend = "memory"

[http]
bind = "127.0.0.1:0"
"#,
        lifetime_seconds, max_per_user
    ))
}

/// Load a config file.
pub fn load_config(file: &NamedTempFile) -> Config {
    Config::from_file(file.path()).expect("Failed to load config")
}

/// A manager over an in-memory store with a manual clock and sequential ids.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryGuardStore>,
    pub manager: GuardManager,
}

impl Harness {
    /// Move the clock forward.
    pub fn advance(&self, secs: u64) {
        self.clock.advance(Duration::from_secs(secs));
    }
}

/// Build a harness with the clock at [`t0`].
pub fn harness(max_per_user: u32, lifetime_seconds: u64) -> Harness {
    let clock = Arc::new(ManualClock::new(t0()));
    let store = Arc::new(MemoryGuardStore::new(clock.clone()));
    let manager = GuardManager::new(
        store.clone(),
        clock.clone(),
        Arc::new(SequentialGenerator::new()),
        GuardPolicy {
            lifetime: Duration::from_secs(lifetime_seconds),
            max_per_user,
        },
    );
    Harness {
        clock,
        store,
        manager,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_memory_config() {
        let file = create_memory_config();
        let config = load_config(&file);
        assert_eq!(config.guards.max_per_user, 3);
        assert_eq!(config.http.bind, "127.0.0.1:0");
    }

    #[tokio::test]
    async fn test_harness_starts_empty() {
        let h = harness(3, 60);
        assert!(h.store.is_empty());
        assert_eq!(h.manager.policy().max_per_user, 3);
    }
}
