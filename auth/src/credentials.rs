//! Application credential issuance and verification.
//!
//! A credential is an opaque id plus a random secret. Only an Argon2id hash
//! of the secret is stored; the raw secret leaves this module exactly once,
//! inside the `IssuedCredential` returned by [`issue`].

use crate::error::{AuthError, Result};
use crate::state::AppCredentialId;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

/// Length of a generated raw secret (hyphenated UUID text).
pub const SECRET_LENGTH: usize = 36;

/// Salt size in bytes.
const SALT_LENGTH: usize = 16;

/// A freshly issued credential.
pub struct IssuedCredential {
    /// Public credential identifier.
    pub id: AppCredentialId,

    /// Raw secret, to be handed to the caller once.
    pub secret: String,

    /// Salted hash of `secret`, to be stored.
    pub secret_hash: String,
}

/// Generate a random secret of [`SECRET_LENGTH`] characters.
#[must_use]
pub fn generate_secret() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Hash a secret with a fresh random salt.
///
/// # Errors
///
/// Returns `AuthError::CredentialHashing` if the OS random source or the
/// hasher fails.
pub fn hash_secret(secret: &str) -> Result<String> {
    let mut salt_bytes = [0u8; SALT_LENGTH];
    getrandom::getrandom(&mut salt_bytes)
        .map_err(|e| AuthError::CredentialHashing(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AuthError::CredentialHashing(e.to_string()))?;

    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AuthError::CredentialHashing(e.to_string()))?;

    Ok(hash.to_string())
}

/// Compare a raw secret against a stored hash.
///
/// Unparsable hashes never verify.
#[must_use]
pub fn verify_secret(secret: &str, hash: &str) -> bool {
    PasswordHash::new(hash).is_ok_and(|parsed| {
        Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Issue a new credential.
///
/// # Errors
///
/// Returns `AuthError::CredentialHashing` if hashing fails.
pub fn issue() -> Result<IssuedCredential> {
    let secret = generate_secret();
    let secret_hash = hash_secret(&secret)?;

    Ok(IssuedCredential {
        id: AppCredentialId::new(),
        secret,
        secret_hash,
    })
}
