//! Identity and session types.
//!
//! All types are `Clone` so they can be handed between the directory, the
//! session bridge, and request handlers without shared ownership.

use crate::error::{AuthError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Internally issued identity number.
///
/// Allocated once from the store's atomic counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InternalId(pub u64);

impl fmt::Display for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque application credential identifier handed to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppCredentialId(pub uuid::Uuid);

impl AppCredentialId {
    /// Generate a new random `AppCredentialId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for AppCredentialId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AppCredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session identifier carried in the signed session cookie.
///
/// Kept as free-form text because the conventional request layer owns the
/// format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a new random `SessionId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Borrow the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Providers
// ═══════════════════════════════════════════════════════════════════════

/// Third-party identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// GitHub `OAuth`.
    GitHub,
    /// Twitter `OAuth`.
    Twitter,
}

impl Provider {
    /// All supported providers.
    pub const ALL: [Self; 2] = [Self::GitHub, Self::Twitter];

    /// Get the provider name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Twitter => "twitter",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "twitter" => Ok(Self::Twitter),
            _ => Err(AuthError::UnknownProvider(s.to_string())),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Identity Records
// ═══════════════════════════════════════════════════════════════════════

/// How a lookup addresses an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityQuery {
    /// By internally issued id (takes precedence over provider ids).
    InternalId(InternalId),
    /// By provider-assigned id, scoped to the provider of the call.
    ProviderId(String),
}

/// Attributes a provider supplies after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAttributes {
    /// Provider-assigned identifier.
    pub provider_id: String,

    /// Display name at the provider.
    pub username: String,

    /// Profile picture URL, if the provider exposes one.
    pub avatar_url: Option<String>,
}

impl ProviderAttributes {
    /// Create attributes without an avatar.
    #[must_use]
    pub fn new(provider_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            username: username.into(),
            avatar_url: None,
        }
    }

    /// Set the avatar URL.
    #[must_use]
    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = Some(url.into());
        self
    }
}

/// One provider account bound to one internal identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Internally issued id.
    pub internal_id: InternalId,

    /// Provider that vouches for this identity.
    pub provider: Provider,

    /// Provider-assigned identifier (unique within `provider`).
    pub provider_id: String,

    /// Display name.
    pub username: String,

    /// Profile picture URL.
    pub avatar_url: Option<String>,

    /// Application credential identifier.
    pub app_credential_id: AppCredentialId,

    /// Salted hash (PHC string) of the application secret.
    pub app_credential_secret_hash: String,
}

/// Stored field names of an identity record.
pub mod fields {
    /// Internal id field.
    pub const INTERNAL_ID: &str = "internalId";
    /// Provider field.
    pub const PROVIDER: &str = "provider";
    /// Provider id field.
    pub const PROVIDER_ID: &str = "providerId";
    /// Username field.
    pub const USERNAME: &str = "username";
    /// Avatar URL field (empty when absent).
    pub const AVATAR_URL: &str = "avatarUrl";
    /// Credential id field.
    pub const APP_CREDENTIAL_ID: &str = "appCredentialId";
    /// Credential hash field.
    pub const APP_CREDENTIAL_SECRET_HASH: &str = "appCredentialSecretHash";
}

impl IdentityRecord {
    /// Flatten into the stored field set.
    #[must_use]
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (fields::INTERNAL_ID, self.internal_id.to_string()),
            (fields::PROVIDER, self.provider.to_string()),
            (fields::PROVIDER_ID, self.provider_id.clone()),
            (fields::USERNAME, self.username.clone()),
            (fields::AVATAR_URL, self.avatar_url.clone().unwrap_or_default()),
            (fields::APP_CREDENTIAL_ID, self.app_credential_id.to_string()),
            (
                fields::APP_CREDENTIAL_SECRET_HASH,
                self.app_credential_secret_hash.clone(),
            ),
        ]
    }

    /// Rebuild a record from its stored field set.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CorruptRecord` if a field is missing or unparsable.
    pub fn from_fields(key: &str, stored: &HashMap<String, String>) -> Result<Self> {
        let field = |name: &'static str| -> Result<&String> {
            stored.get(name).ok_or_else(|| AuthError::CorruptRecord {
                key: key.to_string(),
                field: name.to_string(),
            })
        };
        let corrupt = |name: &'static str| AuthError::CorruptRecord {
            key: key.to_string(),
            field: name.to_string(),
        };

        let internal_id = field(fields::INTERNAL_ID)?
            .parse::<u64>()
            .map(InternalId)
            .map_err(|_| corrupt(fields::INTERNAL_ID))?;
        let provider = field(fields::PROVIDER)?
            .parse::<Provider>()
            .map_err(|_| corrupt(fields::PROVIDER))?;
        let app_credential_id = uuid::Uuid::parse_str(field(fields::APP_CREDENTIAL_ID)?)
            .map(AppCredentialId)
            .map_err(|_| corrupt(fields::APP_CREDENTIAL_ID))?;
        let avatar_url = stored
            .get(fields::AVATAR_URL)
            .filter(|url| !url.is_empty())
            .cloned();

        Ok(Self {
            internal_id,
            provider,
            provider_id: field(fields::PROVIDER_ID)?.clone(),
            username: field(fields::USERNAME)?.clone(),
            avatar_url,
            app_credential_id,
            app_credential_secret_hash: field(fields::APP_CREDENTIAL_SECRET_HASH)?.clone(),
        })
    }
}

/// A freshly created identity together with its raw application secret.
///
/// This is the only value that ever holds the unhashed secret.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedIdentity {
    /// The stored record.
    pub record: IdentityRecord,

    /// Raw application secret (never persisted).
    pub app_credential_secret: String,
}

impl fmt::Debug for IssuedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedIdentity")
            .field("record", &self.record)
            .field("app_credential_secret", &"<redacted>")
            .finish()
    }
}

/// Outcome of `find_or_create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// The provider account was already known.
    Existing(IdentityRecord),
    /// A new identity was issued by this call.
    Created(IssuedIdentity),
}

impl Identity {
    /// Borrow the identity record.
    #[must_use]
    pub const fn record(&self) -> &IdentityRecord {
        match self {
            Self::Existing(record) => record,
            Self::Created(issued) => &issued.record,
        }
    }

    /// Returns `true` if this call created the identity.
    #[must_use]
    pub const fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Sessions
// ═══════════════════════════════════════════════════════════════════════

/// Server-side session state written by the conventional request layer.
///
/// Fields other than the ones named here are carried through untouched so
/// records written by other processes survive a read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Session identifier.
    pub session_id: SessionId,

    /// Authenticated identity, once login has happened.
    #[serde(default)]
    pub internal_id: Option<InternalId>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,

    /// Additional state owned by the conventional request layer.
    #[serde(flatten)]
    pub data: HashMap<String, serde_json::Value>,
}

impl SessionRecord {
    /// Create an anonymous session that expires after `ttl`.
    #[must_use]
    pub fn new(session_id: SessionId, ttl: chrono::Duration) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            internal_id: None,
            created_at: now,
            expires_at: now + ttl,
            data: HashMap::new(),
        }
    }

    /// Bind the session to an authenticated identity.
    #[must_use]
    pub const fn with_identity(mut self, internal_id: InternalId) -> Self {
        self.internal_id = Some(internal_id);
        self
    }

    /// Returns `true` if `expires_at` has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_record() -> IdentityRecord {
        IdentityRecord {
            internal_id: InternalId(7),
            provider: Provider::GitHub,
            provider_id: "123445".to_string(),
            username: "jedi4ever".to_string(),
            avatar_url: None,
            app_credential_id: AppCredentialId::new(),
            app_credential_secret_hash: "$argon2id$hash".to_string(),
        }
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("github".parse::<Provider>().unwrap(), Provider::GitHub);
        assert_eq!("Twitter".parse::<Provider>().unwrap(), Provider::Twitter);
        assert!(matches!(
            "myspace".parse::<Provider>(),
            Err(AuthError::UnknownProvider(name)) if name == "myspace"
        ));
        assert_eq!(Provider::GitHub.to_string(), "github");
    }

    #[test]
    fn test_record_fields_preserve_record() {
        let record = sample_record();
        let stored: HashMap<String, String> = record
            .to_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        assert_eq!(stored.get(fields::AVATAR_URL).unwrap(), "");
        let restored = IdentityRecord::from_fields("user:7", &stored).unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn test_corrupt_record_detected() {
        let mut stored: HashMap<String, String> = sample_record()
            .to_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        stored.insert(fields::INTERNAL_ID.to_string(), "seven".to_string());

        let err = IdentityRecord::from_fields("user:7", &stored).unwrap_err();
        assert!(err.is_integrity_violation());

        stored.remove(fields::USERNAME);
        stored.insert(fields::INTERNAL_ID.to_string(), "7".to_string());
        assert!(matches!(
            IdentityRecord::from_fields("user:7", &stored),
            Err(AuthError::CorruptRecord { field, .. }) if field == fields::USERNAME
        ));
    }

    #[test]
    fn test_issued_identity_debug_redacts_secret() {
        let issued = IssuedIdentity {
            record: sample_record(),
            app_credential_secret: "super-secret-value".to_string(),
        };
        let rendered = format!("{issued:?}");
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_session_record_keeps_foreign_fields() {
        let json = r#"{
            "sessionId": "abc",
            "internalId": 3,
            "createdAt": "2024-01-01T00:00:00Z",
            "expiresAt": "2999-01-01T00:00:00Z",
            "flash": {"info": ["welcome"]}
        }"#;
        let record: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.internal_id, Some(InternalId(3)));
        assert!(record.data.contains_key("flash"));
        assert!(!record.is_expired());

        let reencoded = serde_json::to_value(&record).unwrap();
        assert_eq!(reencoded["flash"]["info"][0], "welcome");
    }
}
