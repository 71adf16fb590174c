//! Redis-backed guard store.
//!
//! Talks RESP2 over a single lazily-opened TCP connection. Commands are
//! serialized on that connection. A transport failure or timeout drops the
//! connection and the next call reconnects; an error reply from the server
//! keeps it.
//!
//! | Operation          | Command                         | Success marker       |
//! |--------------------|---------------------------------|----------------------|
//! | `save_with_expiry` | `SET key value EX s` / `PX ms`  | `+OK`                |
//! | `get`              | `GET key`                       | bulk string or null  |
//! | `scan_by_prefix`   | `SCAN c MATCH p COUNT n` loop   | cursor back at `0`   |
//! | `delete`           | `DEL key`                       | integer > 0          |
//! | `ping`             | `PING`                          | `+PONG`              |

pub mod connection;
pub mod resp;

pub use connection::RedisConnection;
pub use resp::{RespParser, RespValue};

use super::{GuardStore, StoreFuture};
use crate::core::config::RedisStoreConfig;
use crate::core::error::{StoreError, StoreResult};
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Mutex;

/// Guard store on a Redis server.
pub struct RedisGuardStore {
    config: RedisStoreConfig,
    connection: Mutex<Option<RedisConnection>>,
}

impl RedisGuardStore {
    /// Create a store. No connection is made until the first call.
    pub fn new(config: RedisStoreConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
        }
    }

    /// Configured server address.
    pub fn address(&self) -> &str {
        &self.config.address
    }

    /// Run one command, connecting first if needed.
    ///
    /// Error replies are returned as [`StoreError::Protocol`].
    async fn execute(&self, args: &[&[u8]]) -> StoreResult<RespValue> {
        let mut slot = self.connection.lock().await;
        if slot.is_none() {
            *slot = Some(RedisConnection::connect(&self.config).await?);
        }
        let Some(conn) = slot.as_mut() else {
            return Err(StoreError::unavailable("no redis connection"));
        };

        match conn.command(args).await {
            Ok(RespValue::Error(e)) => Err(StoreError::protocol(e)),
            Ok(reply) => Ok(reply),
            Err(e) => {
                tracing::warn!(address = %self.config.address, error = %e, "dropping redis connection");
                *slot = None;
                Err(e)
            }
        }
    }

    async fn save(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        if ttl.is_zero() {
            return Ok(false);
        }

        let (unit, amount): (&[u8], u128) = if ttl.subsec_millis() == 0 {
            (&b"EX"[..], u128::from(ttl.as_secs()))
        } else {
            (&b"PX"[..], ttl.as_millis())
        };
        let amount = amount.to_string();

        let reply = self
            .execute(&[
                b"SET",
                key.as_bytes(),
                value.as_bytes(),
                unit,
                amount.as_bytes(),
            ])
            .await?;

        match reply {
            RespValue::SimpleString(s) => Ok(s == "OK"),
            RespValue::Null => Ok(false),
            other => Err(unexpected("SET", &other)),
        }
    }

    async fn fetch(&self, key: &str) -> StoreResult<Option<String>> {
        match self.execute(&[b"GET", key.as_bytes()]).await? {
            RespValue::Null => Ok(None),
            reply @ RespValue::BulkString(_) => reply
                .as_text()
                .map(Some)
                .ok_or_else(|| StoreError::protocol("GET reply is not valid UTF-8")),
            other => Err(unexpected("GET", &other)),
        }
    }

    async fn scan(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let count = self.config.scan_count.to_string();
        let mut cursor = String::from("0");
        let mut seen = HashSet::new();
        let mut keys = Vec::new();

        loop {
            let reply = self
                .execute(&[
                    b"SCAN",
                    cursor.as_bytes(),
                    b"MATCH",
                    pattern.as_bytes(),
                    b"COUNT",
                    count.as_bytes(),
                ])
                .await?;

            let (next, batch) = parse_scan_reply(reply)?;
            // SCAN may return a key more than once across pages.
            for key in batch {
                if seen.insert(key.clone()) {
                    keys.push(key);
                }
            }

            if next == "0" {
                break;
            }
            cursor = next;
        }

        tracing::trace!(pattern, found = keys.len(), "scan complete");
        Ok(keys)
    }

    async fn remove(&self, key: &str) -> StoreResult<bool> {
        match self.execute(&[b"DEL", key.as_bytes()]).await? {
            RespValue::Integer(n) => Ok(n > 0),
            other => Err(unexpected("DEL", &other)),
        }
    }

    async fn check(&self) -> StoreResult<()> {
        match self.execute(&[b"PING"]).await? {
            RespValue::SimpleString(s) if s == "PONG" => Ok(()),
            other => Err(unexpected("PING", &other)),
        }
    }

    async fn shutdown(&self) -> StoreResult<()> {
        let conn = self.connection.lock().await.take();
        if let Some(mut conn) = conn {
            if let Err(e) = conn.command(&[b"QUIT"]).await {
                tracing::debug!(error = %e, "QUIT failed; closing anyway");
            }
        }
        Ok(())
    }
}

fn unexpected(command: &str, reply: &RespValue) -> StoreError {
    StoreError::protocol(format!(
        "unexpected {} reply: {}",
        command,
        reply.type_name()
    ))
}

/// Split a SCAN reply into the next cursor and the returned keys.
fn parse_scan_reply(reply: RespValue) -> StoreResult<(String, Vec<String>)> {
    let mut parts = match reply {
        RespValue::Array(parts) => parts,
        other => return Err(unexpected("SCAN", &other)),
    };
    if parts.len() != 2 {
        return Err(StoreError::protocol("SCAN reply must have two elements"));
    }

    let keys = match parts.pop() {
        Some(RespValue::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_text()
                    .ok_or_else(|| StoreError::protocol("SCAN key is not a string"))
            })
            .collect::<StoreResult<Vec<_>>>()?,
        _ => return Err(StoreError::protocol("SCAN keys are not an array")),
    };
    let cursor = parts
        .pop()
        .and_then(|c| c.as_text())
        .ok_or_else(|| StoreError::protocol("SCAN cursor is not a string"))?;

    Ok((cursor, keys))
}

impl GuardStore for RedisGuardStore {
    fn save_with_expiry<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Duration,
    ) -> StoreFuture<'a, bool> {
        Box::pin(self.save(key, value, ttl))
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(self.fetch(key))
    }

    fn scan_by_prefix<'a>(&'a self, pattern: &'a str) -> StoreFuture<'a, Vec<String>> {
        Box::pin(self.scan(pattern))
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(self.remove(key))
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(self.check())
    }

    fn close(&self) -> StoreFuture<'_, ()> {
        Box::pin(self.shutdown())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
