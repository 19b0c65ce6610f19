//! Configuration management for the bridge service.
//!
//! Loads configuration from environment variables with defaults matching the
//! conventional request layer it shares sessions with.

use socialapp_auth::{DirectoryConfig, Provider};
use std::env;
use std::time::Duration;

/// Default session cookie name.
pub const DEFAULT_SESSION_KEY: &str = "socialapp.sid";

/// Default cookie signing secret. Override in every real deployment.
pub const DEFAULT_SESSION_SECRET: &str = "the secret";

/// Session bridge configuration.
#[derive(Debug, Clone)]
pub struct SessionBridgeConfig {
    /// Name of the signed session cookie.
    ///
    /// Default: `socialapp.sid`
    pub cookie_name: String,

    /// Secret shared with the conventional layer for cookie signatures.
    pub secret: String,

    /// Upper bound for the session lookup during a handshake.
    ///
    /// Default: 1 second
    pub handshake_timeout: Duration,
}

impl SessionBridgeConfig {
    /// Create configuration with the given signing secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Self::default()
        }
    }

    /// Set the session cookie name.
    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the handshake lookup timeout.
    #[must_use]
    pub const fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

impl Default for SessionBridgeConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_SESSION_KEY.to_string(),
            secret: DEFAULT_SESSION_SECRET.to_string(),
            handshake_timeout: Duration::from_secs(1),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct SocialAppConfig {
    /// Redis URL of the identity store (database 0)
    pub users_redis_url: String,
    /// Redis URL of the session store (database 1)
    pub session_redis_url: String,
    /// Key prefix of stored sessions
    pub session_key_prefix: String,
    /// Identity directory configuration
    pub directory: DirectoryConfig,
    /// Session bridge configuration
    pub bridge: SessionBridgeConfig,
}

impl SocialAppConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable               | Default                      |
    /// |------------------------|------------------------------|
    /// | `USERS_REDIS_URL`      | `redis://127.0.0.1:6379/0`   |
    /// | `SESSION_REDIS_URL`    | `redis://127.0.0.1:6379/1`   |
    /// | `SESSION_KEY`          | `socialapp.sid`              |
    /// | `SESSION_SECRET`       | `the secret`                 |
    /// | `SESSION_KEY_PREFIX`   | `sess:`                      |
    /// | `AUTH_PROVIDERS`       | `github,twitter`             |
    /// | `STORE_TIMEOUT_MS`     | `2000`                       |
    /// | `HANDSHAKE_TIMEOUT_MS` | `1000`                       |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bridge_defaults = SessionBridgeConfig::default();
        let directory_defaults = DirectoryConfig::default();

        let enabled_providers = lookup("AUTH_PROVIDERS")
            .map_or_else(|| directory_defaults.enabled_providers.clone(), |raw| {
                parse_providers(&raw)
            });

        Self {
            users_redis_url: lookup("USERS_REDIS_URL")
                .unwrap_or_else(|| "redis://127.0.0.1:6379/0".to_string()),
            session_redis_url: lookup("SESSION_REDIS_URL")
                .unwrap_or_else(|| "redis://127.0.0.1:6379/1".to_string()),
            session_key_prefix: lookup("SESSION_KEY_PREFIX")
                .unwrap_or_else(|| "sess:".to_string()),
            directory: DirectoryConfig::new(enabled_providers).with_store_timeout(
                lookup("STORE_TIMEOUT_MS")
                    .and_then(|s| s.parse().ok())
                    .map_or(directory_defaults.store_timeout, Duration::from_millis),
            ),
            bridge: SessionBridgeConfig {
                cookie_name: lookup("SESSION_KEY").unwrap_or(bridge_defaults.cookie_name),
                secret: lookup("SESSION_SECRET").unwrap_or(bridge_defaults.secret),
                handshake_timeout: lookup("HANDSHAKE_TIMEOUT_MS")
                    .and_then(|s| s.parse().ok())
                    .map_or(bridge_defaults.handshake_timeout, Duration::from_millis),
            },
        }
    }
}

/// Parse a comma-separated provider list, skipping unknown names.
fn parse_providers(raw: &str) -> Vec<Provider> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter_map(|name| match name.parse::<Provider>() {
            Ok(provider) => Some(provider),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring entry in AUTH_PROVIDERS");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> SocialAppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        SocialAppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);

        assert_eq!(config.users_redis_url, "redis://127.0.0.1:6379/0");
        assert_eq!(config.session_redis_url, "redis://127.0.0.1:6379/1");
        assert_eq!(config.session_key_prefix, "sess:");
        assert_eq!(config.bridge.cookie_name, "socialapp.sid");
        assert_eq!(config.bridge.secret, "the secret");
        assert_eq!(config.bridge.handshake_timeout, Duration::from_secs(1));
        assert_eq!(config.directory.store_timeout, Duration::from_secs(2));
        assert_eq!(config.directory.enabled_providers, Provider::ALL.to_vec());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("SESSION_KEY", "chat.sid"),
            ("SESSION_SECRET", "s3cret"),
            ("AUTH_PROVIDERS", "twitter, mastodon"),
            ("STORE_TIMEOUT_MS", "250"),
            ("HANDSHAKE_TIMEOUT_MS", "not-a-number"),
        ]);

        assert_eq!(config.bridge.cookie_name, "chat.sid");
        assert_eq!(config.bridge.secret, "s3cret");
        assert_eq!(config.directory.enabled_providers, vec![Provider::Twitter]);
        assert_eq!(config.directory.store_timeout, Duration::from_millis(250));
        assert_eq!(config.bridge.handshake_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_bridge_builder() {
        let config = SessionBridgeConfig::new("k")
            .with_cookie_name("sid")
            .with_handshake_timeout(Duration::from_millis(10));

        assert_eq!(config.secret, "k");
        assert_eq!(config.cookie_name, "sid");
        assert_eq!(config.handshake_timeout, Duration::from_millis(10));
    }
}
