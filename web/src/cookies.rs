//! Signed session cookies.
//!
//! The conventional request layer sets `<name>=<signed session id>`; the
//! handshake bridge verifies the same cookie. Both sides derive the signing
//! key from a shared secret:
//!
//! ```text
//! key = SHA-512(secret)        (64 bytes, any secret length accepted)
//! value = HMAC-SHA256(key, session id) ‖ session id
//! ```

use cookie::{Cookie, CookieJar, Key};
use sha2::{Digest, Sha512};
use socialapp_auth::SessionId;
use std::fmt;
use thiserror::Error;

/// Cookie header could not yield a trustworthy session id.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CookieError {
    /// Header is not valid cookie syntax (or not valid UTF-8).
    #[error("Malformed cookie header: {0}")]
    Malformed(String),

    /// The session cookie is present but its signature does not verify.
    #[error("Session cookie signature is invalid")]
    InvalidSignature,
}

/// Signs and verifies the session cookie.
#[derive(Clone)]
pub struct SessionCookies {
    name: String,
    key: Key,
}

impl SessionCookies {
    /// Create a signer for cookie `name` keyed by `secret`.
    #[must_use]
    pub fn new(name: impl Into<String>, secret: &[u8]) -> Self {
        // A SHA-512 digest is exactly the 64 bytes `Key::from` requires
        let digest = Sha512::digest(secret);
        Self {
            name: name.into(),
            key: Key::from(digest.as_slice()),
        }
    }

    /// Cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build the signed session cookie for `session_id`, as set on the
    /// response (`Path=/; HttpOnly`).
    #[must_use]
    pub fn sign(&self, session_id: &SessionId) -> Cookie<'static> {
        let mut jar = CookieJar::new();
        jar.signed_mut(&self.key).add(
            Cookie::build((self.name.clone(), session_id.as_str().to_string()))
                .path("/")
                .http_only(true)
                .build(),
        );

        // The jar holds exactly the cookie just added
        jar.get(&self.name)
            .cloned()
            .unwrap_or_else(|| Cookie::new(self.name.clone(), String::new()))
    }

    /// `Cookie` request header value a browser sends back for `session_id`.
    #[must_use]
    pub fn header_value(&self, session_id: &SessionId) -> String {
        self.sign(session_id).encoded().stripped().to_string()
    }

    /// Extract and verify the session id from a raw `Cookie` header.
    ///
    /// Pairs of other cookies that fail to parse are skipped.
    ///
    /// # Returns
    ///
    /// `None` if the header does not carry the session cookie.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The session cookie's pair is not valid cookie syntax
    /// - The session cookie's signature does not verify
    pub fn verify(&self, header: &str) -> Result<Option<SessionId>, CookieError> {
        let mut session_cookie = None;
        for pair in header.split(';').map(str::trim).filter(|pair| !pair.is_empty()) {
            match Cookie::parse_encoded(pair) {
                Ok(cookie) if cookie.name() == self.name => {
                    session_cookie = Some(cookie.into_owned());
                }
                Ok(_) => {}
                Err(e) if self.is_session_pair(pair) => {
                    return Err(CookieError::Malformed(e.to_string()));
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unparsable cookie pair");
                }
            }
        }

        let Some(session_cookie) = session_cookie else {
            return Ok(None);
        };

        let mut jar = CookieJar::new();
        jar.add_original(session_cookie);

        jar.signed(&self.key)
            .get(&self.name)
            .map(|verified| Some(SessionId(verified.value().to_string())))
            .ok_or(CookieError::InvalidSignature)
    }

    fn is_session_pair(&self, pair: &str) -> bool {
        pair.split_once('=').map_or(pair, |(name, _)| name).trim() == self.name
    }
}

impl fmt::Debug for SessionCookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookies")
            .field("name", &self.name)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn cookies() -> SessionCookies {
        SessionCookies::new("socialapp.sid", b"the secret")
    }

    #[test]
    fn test_signed_cookie_verifies() {
        let cookies = cookies();
        let session_id = SessionId("abc123".to_string());

        let signed = cookies.sign(&session_id);
        assert_eq!(signed.name(), "socialapp.sid");
        assert_ne!(signed.value(), "abc123");
        assert_eq!(signed.http_only(), Some(true));

        let header = format!("theme=dark; {}", cookies.header_value(&session_id));
        assert_eq!(cookies.verify(&header).unwrap(), Some(session_id));
    }

    #[test]
    fn test_header_value_carries_no_attributes() {
        let cookies = cookies();
        let header = cookies.header_value(&SessionId("abc123".to_string()));

        assert!(header.starts_with("socialapp.sid="));
        assert!(!header.contains(';'));
        assert!(!header.contains("HttpOnly"));
    }

    #[test]
    fn test_bare_token_beside_session_cookie_is_skipped() {
        let cookies = cookies();
        let session_id = SessionId("abc123".to_string());

        let header = format!("flag; {}; =orphan", cookies.header_value(&session_id));
        assert_eq!(cookies.verify(&header).unwrap(), Some(session_id));
    }

    #[test]
    fn test_unsigned_cookie_rejected() {
        let err = cookies().verify("socialapp.sid=abc123").unwrap_err();
        assert_eq!(err, CookieError::InvalidSignature);
    }

    #[test]
    fn test_other_secret_rejected() {
        let header = SessionCookies::new("socialapp.sid", b"another secret")
            .header_value(&SessionId("abc123".to_string()));

        let err = cookies().verify(&header).unwrap_err();
        assert_eq!(err, CookieError::InvalidSignature);
    }

    #[test]
    fn test_tampered_value_rejected() {
        let cookies = cookies();
        let signed = cookies.sign(&SessionId("abc123".to_string()));
        let tampered = format!("socialapp.sid={}x", signed.value());

        assert_eq!(
            cookies.verify(&tampered).unwrap_err(),
            CookieError::InvalidSignature
        );
    }

    #[test]
    fn test_missing_session_cookie() {
        assert_eq!(cookies().verify("theme=dark").unwrap(), None);
    }

    #[test]
    fn test_unparsable_session_cookie_is_malformed() {
        // Percent-decodes to invalid UTF-8
        assert!(matches!(
            cookies().verify("theme=dark; socialapp.sid=%FF").unwrap_err(),
            CookieError::Malformed(_)
        ));
        assert!(matches!(
            cookies().verify("socialapp.sid").unwrap_err(),
            CookieError::Malformed(_)
        ));
    }

    #[test]
    fn test_unparsable_other_cookies_only() {
        assert_eq!(cookies().verify("no-equals-sign; theme=%FF").unwrap(), None);
    }

    #[test]
    fn test_short_secret_accepted() {
        let cookies = SessionCookies::new("sid", b"x");
        let header = cookies.header_value(&SessionId("s".to_string()));
        assert_eq!(
            cookies.verify(&header).unwrap(),
            Some(SessionId("s".to_string()))
        );
    }
}
