//! Key layout of the identity store.
//!
//! ```text
//! user:<internalId>:<provider>:<providerId>:<appCredentialId>  → hash (record)
//! identity:<provider>:<providerId>                            → record key (uniqueness guard)
//! counters:user:ids                                           → integer counter
//! ```

use crate::state::{AppCredentialId, InternalId, Provider};

/// Separator between key segments. Provider ids must not contain it.
pub const SEPARATOR: char = ':';

/// Counter used to allocate internal ids.
pub const USER_ID_COUNTER: &str = "counters:user:ids";

/// Composite key of an identity record.
#[must_use]
pub fn record_key(
    internal_id: InternalId,
    provider: Provider,
    provider_id: &str,
    credential_id: AppCredentialId,
) -> String {
    format!("user:{internal_id}:{provider}:{provider_id}:{credential_id}")
}

/// Scan pattern matching every record of a provider account.
#[must_use]
pub fn provider_pattern(provider: Provider, provider_id: &str) -> String {
    format!("user:*:{provider}:{}:*", escape_glob(provider_id))
}

/// Scan pattern matching every record of an internal id.
#[must_use]
pub fn internal_id_pattern(internal_id: InternalId) -> String {
    format!("user:{internal_id}:*")
}

/// Uniqueness guard of a provider account.
#[must_use]
pub fn guard_key(provider: Provider, provider_id: &str) -> String {
    format!("identity:{provider}:{provider_id}")
}

/// Escape glob metacharacters so provider ids match literally.
#[must_use]
pub fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let credential = AppCredentialId(uuid::Uuid::nil());
        assert_eq!(
            record_key(InternalId(12), Provider::GitHub, "123445", credential),
            "user:12:github:123445:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            provider_pattern(Provider::Twitter, "jedi"),
            "user:*:twitter:jedi:*"
        );
        assert_eq!(internal_id_pattern(InternalId(3)), "user:3:*");
        assert_eq!(guard_key(Provider::GitHub, "9"), "identity:github:9");
    }

    #[test]
    fn test_glob_characters_escaped() {
        assert_eq!(escape_glob("a*b?c[d]"), "a\\*b\\?c\\[d\\]");
        assert_eq!(provider_pattern(Provider::GitHub, "*"), "user:*:github:\\*:*");
    }
}
