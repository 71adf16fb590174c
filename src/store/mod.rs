//! Key-value backends for guard records.
//!
//! A [`GuardStore`] is a thin wrapper over key-value primitives. It knows
//! nothing about users or quotas; it reports what the backend did and
//! surfaces transport failures as [`StoreError`].
//!
//! - [`memory::MemoryGuardStore`] - in-process map with clock-driven expiry
//! - [`redis::RedisGuardStore`] - Redis server over RESP2

pub mod memory;
pub mod redis;

use crate::core::config::{StoreBackend, StoreConfig};
use crate::core::error::StoreResult;
use crate::core::time::Clock;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

pub use memory::MemoryGuardStore;
pub use redis::RedisGuardStore;

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Raw key-value operations over guard records.
pub trait GuardStore: Send + Sync {
    /// Write `value` under `key` with a TTL, replacing any previous value and
    /// resetting its expiry in one backend call.
    ///
    /// Returns `true` iff the backend acknowledged the write.
    fn save_with_expiry<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Duration,
    ) -> StoreFuture<'a, bool>;

    /// Read the value under `key`. `None` covers both never-set and expired.
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

    /// All live keys matching a glob `pattern`, unordered and without
    /// duplicates.
    fn scan_by_prefix<'a>(&'a self, pattern: &'a str) -> StoreFuture<'a, Vec<String>>;

    /// Remove `key`. Returns `true` iff a record was actually removed.
    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool>;

    /// Check that the backend answers.
    fn ping(&self) -> StoreFuture<'_, ()>;

    /// Release the backend connection. Later calls may reconnect.
    fn close(&self) -> StoreFuture<'_, ()>;

    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Open the store selected by configuration.
///
/// The Redis store connects eagerly so that a wrong address fails startup
/// rather than the first request.
pub async fn open_store(
    config: &StoreConfig,
    clock: Arc<dyn Clock>,
) -> StoreResult<Arc<dyn GuardStore>> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory guard store; guards do not survive restarts");
            Ok(Arc::new(MemoryGuardStore::new(clock)))
        }
        StoreBackend::Redis => {
            let store = RedisGuardStore::new(config.redis.clone());
            store.ping().await?;
            tracing::info!(address = %config.redis.address, "connected to redis");
            Ok(Arc::new(store))
        }
    }
}
