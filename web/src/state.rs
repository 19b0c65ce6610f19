//! Application state for Axum handlers.

use crate::config::SocialAppConfig;
use crate::cookies::SessionCookies;
use crate::handshake::HandshakeAuthenticator;
use socialapp_auth::stores::{RedisKeyValueStore, RedisSessionStore};
use socialapp_auth::{IdentityDirectory, KeyValueStore, SessionStore};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Generic over the injected stores so tests can run the real router on
/// in-memory mocks.
pub struct AppState<K, S> {
    /// Identity directory.
    pub directory: Arc<IdentityDirectory<K>>,
    /// Handshake authenticator.
    pub authenticator: Arc<HandshakeAuthenticator<S>>,
}

// Manual impl: cloning the Arcs must not require `K: Clone` / `S: Clone`
impl<K, S> Clone for AppState<K, S> {
    fn clone(&self) -> Self {
        Self {
            directory: Arc::clone(&self.directory),
            authenticator: Arc::clone(&self.authenticator),
        }
    }
}

impl<K: KeyValueStore, S: SessionStore> AppState<K, S> {
    /// Create application state from its parts.
    #[must_use]
    pub fn new(directory: IdentityDirectory<K>, authenticator: HandshakeAuthenticator<S>) -> Self {
        Self {
            directory: Arc::new(directory),
            authenticator: Arc::new(authenticator),
        }
    }
}

impl AppState<RedisKeyValueStore, RedisSessionStore> {
    /// Connect the Redis stores named by `config`.
    ///
    /// # Errors
    ///
    /// Returns error if either Redis connection cannot be established.
    pub async fn connect(config: &SocialAppConfig) -> socialapp_auth::Result<Self> {
        let users = RedisKeyValueStore::new(&config.users_redis_url).await?;
        let sessions = RedisSessionStore::new(&config.session_redis_url)
            .await?
            .with_key_prefix(config.session_key_prefix.clone());

        tracing::info!(
            users = %config.users_redis_url,
            sessions = %config.session_redis_url,
            "Connected identity and session stores"
        );

        Ok(Self::new(
            IdentityDirectory::new(users, config.directory.clone()),
            HandshakeAuthenticator::new(
                sessions,
                SessionCookies::new(
                    config.bridge.cookie_name.clone(),
                    config.bridge.secret.as_bytes(),
                ),
                config.bridge.handshake_timeout,
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socialapp_auth::mocks::{MockKeyValueStore, MockSessionStore};

    #[test]
    fn test_state_is_clone() {
        // Ensure AppState implements Clone (required for Axum)
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState<MockKeyValueStore, MockSessionStore>>();
    }
}
