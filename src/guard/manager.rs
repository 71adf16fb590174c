//! Guard lifecycle manager.
//!
//! The manager owns every domain rule: the per-user quota, existence checks
//! and expiry anchoring. It holds no mutable state of its own; each
//! operation is a fixed sequence of store calls.
//!
//! ```text
//! Unissued --issue--> Active --refresh--> Active --revoke--> Unissued
//!                       |
//!                       +--(expiry elapses)--> Unissued
//! ```

use super::id::IdGenerator;
use super::key::{prefix_for, prepare_key};
use super::record::GuardRecord;
use crate::core::config::GuardsConfig;
use crate::core::error::{FailureOrigin, GuardError, GuardResult};
use crate::core::time::{expiry_after, Clock};
use crate::store::GuardStore;
use std::sync::Arc;
use std::time::Duration;

/// Fixed lifecycle parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardPolicy {
    /// Lifetime applied on issue and on every refresh.
    pub lifetime: Duration,
    /// Maximum simultaneously active guards per user.
    pub max_per_user: u32,
}

impl From<&GuardsConfig> for GuardPolicy {
    fn from(config: &GuardsConfig) -> Self {
        Self {
            lifetime: config.lifetime(),
            max_per_user: config.max_per_user,
        }
    }
}

/// Issues, refreshes and revokes guards.
///
/// Cheap to clone and safe to share across tasks. There is no in-process
/// locking around an operation, which leaves two races open:
///
/// - **Quota race.** Two concurrent [`issue`](Self::issue) calls for the same
///   user can both pass the count check before either writes, so the user
///   may briefly hold more than `max_per_user` guards.
/// - **Revoke/expire race.** A record can expire, or be revoked by another
///   caller, between the existence check and the delete in
///   [`revoke`](Self::revoke). That surfaces as
///   [`GuardError::DeletionFailure`].
#[derive(Clone)]
pub struct GuardManager {
    store: Arc<dyn GuardStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    policy: GuardPolicy,
}

impl GuardManager {
    /// Create a manager over an opened store.
    pub fn new(
        store: Arc<dyn GuardStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        policy: GuardPolicy,
    ) -> Self {
        Self {
            store,
            clock,
            ids,
            policy,
        }
    }

    /// Lifecycle parameters.
    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }

    /// Backing store.
    pub fn store(&self) -> &Arc<dyn GuardStore> {
        &self.store
    }

    /// Issue a new guard for `user_id`.
    ///
    /// Fails with `QuotaExceeded` without writing anything once the user
    /// already holds `max_per_user` live guards.
    pub async fn issue(&self, user_id: &str) -> GuardResult<String> {
        let result = self.try_issue(user_id).await;
        log_outcome("issue", user_id, &result);
        result
    }

    /// Push a guard's expiry to `now + lifetime`.
    ///
    /// The new expiry is anchored to the current instant, not to the old
    /// expiry. An expired guard cannot be refreshed.
    pub async fn refresh(&self, user_id: &str, guard_id: &str) -> GuardResult<String> {
        let result = self.try_refresh(user_id, guard_id).await;
        log_outcome("refresh", user_id, &result);
        result
    }

    /// Revoke a guard.
    pub async fn revoke(&self, user_id: &str, guard_id: &str) -> GuardResult<String> {
        let result = self.try_revoke(user_id, guard_id).await;
        log_outcome("revoke", user_id, &result);
        result
    }

    async fn try_issue(&self, user_id: &str) -> GuardResult<String> {
        let existing = self.store.scan_by_prefix(&prefix_for(user_id)).await?;
        if existing.len() >= self.policy.max_per_user as usize {
            return Err(GuardError::QuotaExceeded {
                max: self.policy.max_per_user,
            });
        }

        let guard_id = self.ids.next_id();
        let key = prepare_key(user_id, &guard_id);
        self.persist(&key).await?;
        Ok(guard_id)
    }

    async fn try_refresh(&self, user_id: &str, guard_id: &str) -> GuardResult<String> {
        let key = prepare_key(user_id, guard_id);
        if !self.exists(&key).await? {
            return Err(GuardError::NotFound);
        }

        self.persist(&key).await?;
        Ok(guard_id.to_string())
    }

    async fn try_revoke(&self, user_id: &str, guard_id: &str) -> GuardResult<String> {
        let key = prepare_key(user_id, guard_id);
        if !self.exists(&key).await? {
            return Err(GuardError::NotFound);
        }

        if !self.store.delete(&key).await? {
            return Err(GuardError::DeletionFailure { key });
        }
        Ok(guard_id.to_string())
    }

    /// Write a record expiring one lifetime from now.
    async fn persist(&self, key: &str) -> GuardResult<()> {
        let record = GuardRecord::new(expiry_after(self.clock.now(), self.policy.lifetime));
        let saved = self
            .store
            .save_with_expiry(key, &record.encode(), self.policy.lifetime)
            .await?;
        if !saved {
            return Err(GuardError::PersistenceFailure {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// Whether a live record exists under `key`.
    ///
    /// A record whose stored expiry has passed counts as absent even if the
    /// backend has not evicted it yet. A value that does not decode is
    /// trusted to be live; the backend TTL still bounds it.
    async fn exists(&self, key: &str) -> GuardResult<bool> {
        let Some(value) = self.store.get(key).await? else {
            return Ok(false);
        };

        match GuardRecord::decode(&value) {
            Some(record) => Ok(record.is_live_at(self.clock.now())),
            None => {
                tracing::warn!(key, value = %value, "guard record value is not a timestamp");
                Ok(true)
            }
        }
    }
}

fn log_outcome(operation: &'static str, user_id: &str, result: &GuardResult<String>) {
    match result {
        Ok(guard_id) => {
            tracing::debug!(operation, user_id, guard_id = %guard_id, "guard operation succeeded");
        }
        Err(e) => match e.origin() {
            FailureOrigin::Client => {
                tracing::warn!(operation, user_id, code = e.code(), "guard operation rejected");
            }
            FailureOrigin::Server | FailureOrigin::Infrastructure => {
                tracing::error!(operation, user_id, code = e.code(), error = %e, "guard operation failed");
            }
        },
    }
}
