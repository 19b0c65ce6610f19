//! Error types for identity and session operations.

use crate::state::Provider;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for identity and session operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Error taxonomy for the identity directory and the session store.
///
/// "Not found" is deliberately absent: lookups report a missing record as
/// `Ok(None)`. Everything here is a genuine failure, grouped so callers can
/// decide between retrying, surfacing, or rejecting input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Invalid Input
    // ═══════════════════════════════════════════════════════════

    /// Provider name is not one of the supported providers.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Provider is supported but not enabled by configuration.
    #[error("Provider {0} is not enabled")]
    ProviderDisabled(Provider),

    /// Query or attribute payload is malformed.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Provider profile is missing a required attribute.
    #[error("Provider {provider} profile is missing `{field}`")]
    InvalidProfile {
        /// Provider that supplied the profile
        provider: Provider,
        /// Missing or malformed field
        field: &'static str,
    },

    // ═══════════════════════════════════════════════════════════
    // Conflicts
    // ═══════════════════════════════════════════════════════════

    /// An identity for this provider account already exists.
    #[error("Identity {provider}:{provider_id} already exists")]
    IdentityExists {
        /// Provider
        provider: Provider,
        /// Provider-assigned identifier
        provider_id: String,
    },

    /// The guarded create kept losing to concurrent removals.
    #[error("Gave up creating identity after {attempts} conflicting attempts")]
    CreateContention {
        /// Number of attempts made
        attempts: u32,
    },

    // ═══════════════════════════════════════════════════════════
    // Integrity Violations
    // ═══════════════════════════════════════════════════════════

    /// A lookup that must be unique matched several records.
    #[error("Multiple records ({matches}) match key query: {pattern}")]
    MultipleMatches {
        /// Scan pattern that was used
        pattern: String,
        /// Number of matching keys
        matches: usize,
    },

    /// Deleting a single record affected an unexpected number of entries.
    #[error("Remove count was not 1 but {count} for key {key}")]
    RemoveCountMismatch {
        /// Record key
        key: String,
        /// Entries actually removed
        count: u64,
    },

    /// A stored record is missing a field or holds an unparsable value.
    #[error("Corrupt record {key}: field `{field}`")]
    CorruptRecord {
        /// Record key
        key: String,
        /// Offending field
        field: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Transient I/O
    // ═══════════════════════════════════════════════════════════

    /// Backing store could not be reached.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Backing store did not answer in time.
    #[error("Store operation `{operation}` timed out after {timeout:?}")]
    StoreTimeout {
        /// Operation name
        operation: &'static str,
        /// Configured bound
        timeout: Duration,
    },

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Credential hashing failed.
    #[error("Credential hashing failed: {0}")]
    CredentialHashing(String),

    /// Internal error (should not be exposed to users).
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    /// Returns `true` if the caller may retry the operation.
    ///
    /// # Examples
    ///
    /// ```
    /// # use socialapp_auth::AuthError;
    /// assert!(AuthError::StoreUnavailable("refused".into()).is_transient());
    /// assert!(!AuthError::InvalidQuery("empty".into()).is_transient());
    /// ```
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::StoreTimeout { .. })
    }

    /// Returns `true` if stored data breaks a uniqueness invariant.
    ///
    /// # Examples
    ///
    /// ```
    /// # use socialapp_auth::AuthError;
    /// let err = AuthError::MultipleMatches { pattern: "user:1:*".into(), matches: 2 };
    /// assert!(err.is_integrity_violation());
    /// ```
    #[must_use]
    pub const fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            Self::MultipleMatches { .. }
                | Self::RemoveCountMismatch { .. }
                | Self::CorruptRecord { .. }
        )
    }

    /// Returns `true` if this error is due to invalid caller input.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::UnknownProvider(_)
                | Self::ProviderDisabled(_)
                | Self::InvalidQuery(_)
                | Self::InvalidProfile { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let timeout = AuthError::StoreTimeout {
            operation: "scan",
            timeout: Duration::from_millis(10),
        };
        assert!(timeout.is_transient());
        assert!(!timeout.is_integrity_violation());

        let mismatch = AuthError::RemoveCountMismatch {
            key: "user:1:github:1:x".into(),
            count: 0,
        };
        assert!(mismatch.is_integrity_violation());
        assert!(!mismatch.is_transient());

        assert!(AuthError::UnknownProvider("myspace".into()).is_invalid_input());
        assert!(AuthError::ProviderDisabled(Provider::Twitter).is_invalid_input());

        let exists = AuthError::IdentityExists {
            provider: Provider::GitHub,
            provider_id: "1".into(),
        };
        assert!(!exists.is_transient());
        assert!(!exists.is_integrity_violation());
        assert!(!exists.is_invalid_input());
    }

    #[test]
    fn test_error_messages() {
        let err = AuthError::MultipleMatches {
            pattern: "user:*:github:42:*".into(),
            matches: 2,
        };
        assert_eq!(
            err.to_string(),
            "Multiple records (2) match key query: user:*:github:42:*"
        );

        let err = AuthError::RemoveCountMismatch {
            key: "k".into(),
            count: 0,
        };
        assert_eq!(err.to_string(), "Remove count was not 1 but 0 for key k");
    }
}
