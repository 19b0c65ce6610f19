//! Redis-based key-value store for identity records.
//!
//! # Architecture
//!
//! - **Records**: Redis hashes (`HGETALL` / `HSET`)
//! - **Counter**: `INCR`
//! - **Scans**: cursor-based `SCAN ... MATCH`, never `KEYS`
//! - **Guarded create / delete**: Lua scripts, so guard and record change
//!   together or not at all
//!
//! # Example
//!
//! ```no_run
//! use socialapp_auth::stores::RedisKeyValueStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisKeyValueStore::new("redis://127.0.0.1:6379/0").await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::providers::{GuardedWrite, KeyValueStore};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::collections::HashMap;

/// Keys fetched per `SCAN` round trip.
const SCAN_BATCH: usize = 100;

/// KEYS[1] = guard, KEYS[2] = record, ARGV = field/value pairs.
const CREATE_IF_ABSENT: &str = r"
local existing = redis.call('GET', KEYS[1])
if existing then
    return existing
end
redis.call('SET', KEYS[1], KEYS[2])
redis.call('HSET', KEYS[2], unpack(ARGV))
return false
";

/// KEYS[1] = record, KEYS[2] = guard.
const DELETE_RECORD: &str = r"
local deleted = redis.call('DEL', KEYS[1])
if redis.call('GET', KEYS[2]) == KEYS[1] then
    redis.call('DEL', KEYS[2])
end
return deleted
";

/// Redis-backed identity store.
///
/// Cloning is cheap; clones share the same `ConnectionManager`.
#[derive(Clone)]
pub struct RedisKeyValueStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisKeyValueStore {
    /// Connect to Redis.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL including the database
    ///   (e.g., "redis://127.0.0.1:6379/0")
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(|e| {
            AuthError::StoreUnavailable(format!("Failed to create Redis client: {e}"))
        })?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            AuthError::StoreUnavailable(format!("Failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self { conn_manager })
    }
}

impl KeyValueStore for RedisKeyValueStore {
    async fn get_record(&self, key: &str) -> Result<Option<HashMap<String, String>>> {
        let mut conn = self.conn_manager.clone();

        let fields: HashMap<String, String> = conn.hgetall(key).await.map_err(|e| {
            AuthError::StoreUnavailable(format!("Failed to read record {key}: {e}"))
        })?;

        // HGETALL on a missing key yields an empty hash
        Ok(if fields.is_empty() { None } else { Some(fields) })
    }

    async fn put_record(&self, key: &str, fields: &[(&'static str, String)]) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let _: () = conn.hset_multiple(key, fields).await.map_err(|e| {
            AuthError::StoreUnavailable(format!("Failed to write record {key}: {e}"))
        })?;

        Ok(())
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn_manager.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    AuthError::StoreUnavailable(format!("Failed to scan {pattern}: {e}"))
                })?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once across iterations
        keys.sort_unstable();
        keys.dedup();

        tracing::debug!(pattern = %pattern, matches = keys.len(), "Scanned identity keys");

        Ok(keys)
    }

    async fn increment(&self, key: &str) -> Result<u64> {
        let mut conn = self.conn_manager.clone();

        let value: u64 = conn.incr(key, 1_u64).await.map_err(|e| {
            AuthError::StoreUnavailable(format!("Failed to increment {key}: {e}"))
        })?;

        Ok(value)
    }

    async fn create_if_absent(
        &self,
        guard_key: &str,
        record_key: &str,
        fields: &[(&'static str, String)],
    ) -> Result<GuardedWrite> {
        let mut conn = self.conn_manager.clone();

        let script = redis::Script::new(CREATE_IF_ABSENT);
        let mut invocation = script.prepare_invoke();
        invocation.key(guard_key).key(record_key);
        for (field, value) in fields {
            invocation.arg(*field).arg(value);
        }

        let existing: Option<String> = invocation.invoke_async(&mut conn).await.map_err(|e| {
            AuthError::StoreUnavailable(format!("Failed to execute guarded create: {e}"))
        })?;

        Ok(match existing {
            None => GuardedWrite::Written,
            Some(record_key) => GuardedWrite::Exists { record_key },
        })
    }

    async fn delete_record(&self, record_key: &str, guard_key: &str) -> Result<u64> {
        let mut conn = self.conn_manager.clone();

        let script = redis::Script::new(DELETE_RECORD);
        let deleted: u64 = script
            .key(record_key)
            .key(guard_key)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| {
                AuthError::StoreUnavailable(format!("Failed to execute record deletion: {e}"))
            })?;

        Ok(deleted)
    }
}
