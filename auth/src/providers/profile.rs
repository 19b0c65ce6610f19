//! Provider profile normalization.
//!
//! The OAuth exchange itself happens outside this crate. What arrives here is
//! the provider's user document, and each provider names the same facts
//! differently:
//!
//! | Attribute     | GitHub (`/user`) | Twitter (`verify_credentials`)   |
//! |---------------|------------------|----------------------------------|
//! | provider id   | `id`             | `id_str`, then `id`              |
//! | username      | `login`          | `screen_name`                    |
//! | avatar        | `avatar_url`     | `profile_image_url_https`        |
//!
//! Profiles that were already normalized by a login library (`username`,
//! `photos[0].value`, `_json`) are accepted as a fallback.

use crate::error::{AuthError, Result};
use crate::state::{Provider, ProviderAttributes};
use serde_json::Value;

impl Provider {
    /// Extract the identity attributes from a provider profile document.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidProfile`] if the id or username is
    /// missing or empty.
    pub fn attributes_from_profile(self, profile: &Value) -> Result<ProviderAttributes> {
        let (id_fields, username_fields, avatar): (&[&str], &[&str], Option<String>) = match self {
            Self::GitHub => (
                &["id"],
                &["login", "username"],
                text(profile, "avatar_url")
                    .or_else(|| profile.get("_json").and_then(|raw| text(raw, "avatar_url")))
                    .or_else(|| first_photo(profile)),
            ),
            Self::Twitter => (
                &["id_str", "id"],
                &["screen_name", "username"],
                text(profile, "profile_image_url_https").or_else(|| first_photo(profile)),
            ),
        };

        let provider_id = first_text(profile, id_fields).ok_or(AuthError::InvalidProfile {
            provider: self,
            field: "id",
        })?;
        let username = first_text(profile, username_fields).ok_or(AuthError::InvalidProfile {
            provider: self,
            field: "username",
        })?;

        let attributes = ProviderAttributes::new(provider_id, username);
        Ok(match avatar {
            Some(url) => attributes.with_avatar_url(url),
            None => attributes,
        })
    }
}

/// Field as non-empty text; numbers are rendered in decimal.
fn text(value: &Value, field: &str) -> Option<String> {
    match value.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(value: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| text(value, field))
}

fn first_photo(profile: &Value) -> Option<String> {
    profile
        .get("photos")?
        .as_array()?
        .first()
        .and_then(|photo| text(photo, "value"))
}
