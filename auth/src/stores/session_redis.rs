//! Redis-based session store implementation.
//!
//! Sessions are written by the conventional request layer and read by the
//! handshake bridge, so both sides must agree on the layout:
//!
//! - **Key**: `sess:{session_id}` (prefix configurable)
//! - **Value**: JSON-serialized [`SessionRecord`]
//! - **TTL**: derived from `expires_at`
//!
//! # Example
//!
//! ```no_run
//! use socialapp_auth::stores::RedisSessionStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisSessionStore::new("redis://127.0.0.1:6379/1")
//!     .await?
//!     .with_key_prefix("sess:");
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::{SessionId, SessionRecord};
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Default key prefix, shared with the conventional session middleware.
pub const DEFAULT_KEY_PREFIX: &str = "sess:";

/// Redis-based session store with TTL-based expiration.
#[derive(Clone)]
pub struct RedisSessionStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,

    /// Namespace of session keys.
    key_prefix: String,
}

impl RedisSessionStore {
    /// Create a new Redis session store.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://127.0.0.1:6379/1")
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

        Ok(Self {
            conn_manager,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        })
    }

    /// Use a different key prefix.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Get the Redis key for a session.
    fn session_key(&self, session_id: &SessionId) -> String {
        format!("{}{}", self.key_prefix, session_id.as_str())
    }
}

impl SessionStore for RedisSessionStore {
    async fn get_session(&self, session_id: &SessionId) -> Result<Option<SessionRecord>> {
        let mut conn = self.conn_manager.clone();
        let session_key = self.session_key(session_id);

        let payload: Option<String> = conn.get(&session_key).await.map_err(|e| {
            AuthError::StoreUnavailable(format!("Failed to get session from Redis: {e}"))
        })?;

        let Some(payload) = payload else {
            return Ok(None);
        };

        let session: SessionRecord = serde_json::from_str(&payload)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;

        // TTL normally removes the key first; clock skew or PERSIST can leave it behind
        if session.is_expired() {
            tracing::warn!(
                session_id = %session_id,
                expires_at = %session.expires_at,
                "Session expired (TTL should have cleaned this up)"
            );
            return Ok(None);
        }

        Ok(Some(session))
    }

    async fn save_session(&self, session: &SessionRecord) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let session_key = self.session_key(&session.session_id);

        let ttl_seconds = (session.expires_at - Utc::now()).num_seconds();
        if ttl_seconds <= 0 {
            // Already expired: make sure no stale copy survives
            let _: () = conn.del(&session_key).await.map_err(|e| {
                AuthError::StoreUnavailable(format!("Failed to delete expired session: {e}"))
            })?;
            return Ok(());
        }

        let payload = serde_json::to_string(session)
            .map_err(|e| AuthError::SerializationError(e.to_string()))?;

        #[allow(clippy::cast_sign_loss)]
        let _: () = conn
            .set_ex(&session_key, payload, ttl_seconds as u64)
            .await
            .map_err(|e| AuthError::StoreUnavailable(format!("Failed to save session: {e}")))?;

        tracing::info!(
            session_id = %session.session_id,
            ttl_seconds = ttl_seconds,
            "Saved session in Redis"
        );

        Ok(())
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let session_key = self.session_key(session_id);

        let _: () = conn
            .del(&session_key)
            .await
            .map_err(|e| AuthError::StoreUnavailable(format!("Failed to delete session: {e}")))?;

        tracing::info!(session_id = %session_id, "Deleted session from Redis");

        Ok(())
    }
}
