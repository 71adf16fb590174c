//! In-process guard store.
//!
//! Records expire against the injected [`Clock`], never against wall time,
//! so a test that advances a `ManualClock` past a TTL sees the record vanish
//! exactly as it would from Redis. Expired records are dropped lazily: a
//! read drops the key it finds expired, and every prefix scan sweeps the
//! whole map, so the map stays bounded by the live set plus whatever expired
//! since the last issue.
//!
//! Fault injection switches let tests exercise the manager's failure paths:
//! [`MemoryGuardStore::set_reject_writes`] makes saves and deletes report
//! `false`, and [`MemoryGuardStore::set_unavailable`] makes every call fail
//! with [`StoreError::Unavailable`].

use super::{GuardStore, StoreFuture};
use crate::core::error::{StoreError, StoreResult};
use crate::core::time::{expiry_after, Clock};
use crate::guard::key::pattern_matches;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-memory guard store.
pub struct MemoryGuardStore {
    data: RwLock<HashMap<String, MemoryEntry>>,
    clock: Arc<dyn Clock>,
    reject_writes: AtomicBool,
    unavailable: AtomicBool,
    mutations: AtomicU64,
}

impl MemoryGuardStore {
    /// Create an empty store reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            clock,
            reject_writes: AtomicBool::new(false),
            unavailable: AtomicBool::new(false),
            mutations: AtomicU64::new(0),
        }
    }

    /// Make writes and deletes report `false` without touching data.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::Release);
    }

    /// Make every operation fail as if the backend were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    /// Number of successful saves and deletes since creation.
    pub fn mutation_count(&self) -> u64 {
        self.mutations.load(Ordering::Acquire)
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        self.data
            .read()
            .values()
            .filter(|e| now < e.expires_at)
            .count()
    }

    /// Whether no live records exist.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining TTL of a live record.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = self.clock.now();
        self.data
            .read()
            .get(key)
            .filter(|e| now < e.expires_at)
            .and_then(|e| (e.expires_at - now).to_std().ok())
    }

    /// Drop every expired record. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        evict_expired(&mut self.data.write(), now)
    }

    /// Number of entries held, expired ones included.
    pub fn entry_count(&self) -> usize {
        self.data.read().len()
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(StoreError::unavailable("memory store marked unavailable"));
        }
        Ok(())
    }

    fn rejects_writes(&self) -> bool {
        self.reject_writes.load(Ordering::Acquire)
    }

    fn save_sync(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        self.check_available()?;
        if self.rejects_writes() || ttl.is_zero() {
            return Ok(false);
        }

        let entry = MemoryEntry {
            value: value.to_string(),
            expires_at: expiry_after(self.clock.now(), ttl),
        };
        self.data.write().insert(key.to_string(), entry);
        self.mutations.fetch_add(1, Ordering::AcqRel);
        Ok(true)
    }

    fn get_sync(&self, key: &str) -> StoreResult<Option<String>> {
        self.check_available()?;
        let now = self.clock.now();

        let expired = match self.data.read().get(key) {
            Some(entry) if now < entry.expires_at => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            // A save may have landed since the read lock was released.
            let mut data = self.data.write();
            if data.get(key).is_some_and(|e| now >= e.expires_at) {
                data.remove(key);
            }
        }
        Ok(None)
    }

    fn scan_sync(&self, pattern: &str) -> StoreResult<Vec<String>> {
        self.check_available()?;
        let now = self.clock.now();
        let mut data = self.data.write();
        let evicted = evict_expired(&mut data, now);
        if evicted > 0 {
            tracing::trace!(evicted, "evicted expired guard records");
        }

        Ok(data
            .keys()
            .filter(|k| pattern_matches(pattern, k))
            .cloned()
            .collect())
    }

    fn delete_sync(&self, key: &str) -> StoreResult<bool> {
        self.check_available()?;
        if self.rejects_writes() {
            return Ok(false);
        }

        let now = self.clock.now();
        let removed = self.data.write().remove(key);
        let was_live = removed.is_some_and(|e| now < e.expires_at);
        if was_live {
            self.mutations.fetch_add(1, Ordering::AcqRel);
        }
        Ok(was_live)
    }
}

/// Drop entries that are expired at `now`. Returns how many were removed.
fn evict_expired(data: &mut HashMap<String, MemoryEntry>, now: DateTime<Utc>) -> usize {
    let before = data.len();
    data.retain(|_, e| now < e.expires_at);
    before - data.len()
}

impl GuardStore for MemoryGuardStore {
    fn save_with_expiry<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Duration,
    ) -> StoreFuture<'a, bool> {
        let result = self.save_sync(key, value, ttl);
        Box::pin(async move { result })
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        let result = self.get_sync(key);
        Box::pin(async move { result })
    }

    fn scan_by_prefix<'a>(&'a self, pattern: &'a str) -> StoreFuture<'a, Vec<String>> {
        let result = self.scan_sync(pattern);
        Box::pin(async move { result })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        let result = self.delete_sync(key);
        Box::pin(async move { result })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        let result = self.check_available();
        Box::pin(async move { result })
    }

    fn close(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { Ok(()) })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
