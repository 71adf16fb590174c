//! Single RESP2 connection with deadlines.

use super::resp::{encode_command, ParseResult, RespParser, RespValue};
use crate::core::config::RedisStoreConfig;
use crate::core::error::{StoreError, StoreResult};
use bytes::{Buf, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Initial read buffer capacity.
const READ_BUFFER_CAPACITY: usize = 4096;

/// An open connection to a Redis server.
///
/// Replies are returned as-is, including error replies; the caller decides
/// whether an error reply poisons the connection. Transport failures and
/// timeouts leave the stream in an unknown state and the connection must be
/// discarded.
#[derive(Debug)]
pub struct RedisConnection {
    stream: TcpStream,
    buffer: BytesMut,
    parser: RespParser,
    command_timeout: Duration,
}

impl RedisConnection {
    /// Connect, then select the configured database.
    pub async fn connect(config: &RedisStoreConfig) -> StoreResult<Self> {
        let stream = timeout(config.connect_timeout(), TcpStream::connect(&config.address))
            .await
            .map_err(|_| StoreError::Timeout {
                timeout_ms: config.connect_timeout_ms,
            })?
            .map_err(|e| StoreError::unavailable(format!("connect {}: {}", config.address, e)))?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "failed to set TCP_NODELAY");
        }

        let mut conn = Self {
            stream,
            buffer: BytesMut::with_capacity(READ_BUFFER_CAPACITY),
            parser: RespParser::new(),
            command_timeout: config.command_timeout(),
        };

        if config.database != 0 {
            let db = config.database.to_string();
            match conn.command(&[b"SELECT", db.as_bytes()]).await? {
                RespValue::SimpleString(s) if s == "OK" => {}
                RespValue::Error(e) => return Err(StoreError::protocol(e)),
                other => {
                    return Err(StoreError::protocol(format!(
                        "unexpected SELECT reply: {}",
                        other.type_name()
                    )))
                }
            }
        }

        tracing::debug!(address = %config.address, database = config.database, "redis connection established");
        Ok(conn)
    }

    /// Send one command and wait for its reply within the command deadline.
    pub async fn command(&mut self, args: &[&[u8]]) -> StoreResult<RespValue> {
        let deadline = self.command_timeout;
        timeout(deadline, self.round_trip(args))
            .await
            .map_err(|_| StoreError::Timeout {
                timeout_ms: deadline.as_millis() as u64,
            })?
    }

    async fn round_trip(&mut self, args: &[&[u8]]) -> StoreResult<RespValue> {
        let frame = encode_command(args);
        self.stream
            .write_all(&frame)
            .await
            .map_err(|e| StoreError::unavailable(format!("write: {}", e)))?;
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> StoreResult<RespValue> {
        loop {
            match self.parser.parse(&self.buffer) {
                ParseResult::Complete(value, consumed) => {
                    self.buffer.advance(consumed);
                    return Ok(value);
                }
                ParseResult::Incomplete => {}
                ParseResult::Error(e) => return Err(StoreError::protocol(e)),
            }

            let read = self
                .stream
                .read_buf(&mut self.buffer)
                .await
                .map_err(|e| StoreError::unavailable(format!("read: {}", e)))?;
            if read == 0 {
                return Err(StoreError::unavailable("connection closed by server"));
            }
        }
    }
}
