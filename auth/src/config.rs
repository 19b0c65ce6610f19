//! Identity directory configuration.
//!
//! Configuration values should be provided by the application, not hardcoded.

use crate::state::Provider;
use std::time::Duration;

/// Identity directory configuration.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Providers that may create identities.
    ///
    /// Default: all supported providers
    pub enabled_providers: Vec<Provider>,

    /// Upper bound for a single store operation.
    ///
    /// Default: 2 seconds
    pub store_timeout: Duration,

    /// How often `find_or_create` retries when the winning record of a lost
    /// race disappears before it can be read.
    ///
    /// Default: 3
    pub max_create_attempts: u32,
}

impl DirectoryConfig {
    /// Create configuration enabling the given providers.
    #[must_use]
    pub fn new(enabled_providers: Vec<Provider>) -> Self {
        Self {
            enabled_providers,
            ..Self::default()
        }
    }

    /// Set the store operation timeout.
    #[must_use]
    pub const fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Set the maximum number of create attempts.
    #[must_use]
    pub const fn with_max_create_attempts(mut self, attempts: u32) -> Self {
        self.max_create_attempts = attempts;
        self
    }

    /// Returns `true` if `provider` is enabled.
    #[must_use]
    pub fn is_enabled(&self, provider: Provider) -> bool {
        self.enabled_providers.contains(&provider)
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            enabled_providers: Provider::ALL.to_vec(),
            store_timeout: Duration::from_secs(2),
            max_create_attempts: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_config_builder() {
        let config = DirectoryConfig::new(vec![Provider::GitHub])
            .with_store_timeout(Duration::from_millis(250))
            .with_max_create_attempts(5);

        assert!(config.is_enabled(Provider::GitHub));
        assert!(!config.is_enabled(Provider::Twitter));
        assert_eq!(config.store_timeout, Duration::from_millis(250));
        assert_eq!(config.max_create_attempts, 5);
    }

    #[test]
    fn test_default_config() {
        let config = DirectoryConfig::default();
        assert!(config.is_enabled(Provider::GitHub));
        assert!(config.is_enabled(Provider::Twitter));
        assert_eq!(config.store_timeout, Duration::from_secs(2));
        assert_eq!(config.max_create_attempts, 3);
    }
}
