//! Real-time handshake authentication.
//!
//! Decides, once per connection attempt, whether a WebSocket upgrade may
//! proceed and which session it carries:
//!
//! ```text
//! no Cookie header ───────────────────────────────► Admit (anonymous)
//! Cookie header ─┬─ unparsable / bad signature ──► Reject MalformedCredential
//!                ├─ session cookie absent ───────► Reject SessionNotFound
//!                └─ verified ─┬─ store miss / error / timeout ─► Reject SessionNotFound
//!                             └─ session found ────────────────► Admit (session)
//! ```
//!
//! The authenticator holds no mutable state and may be shared freely.

use crate::cookies::SessionCookies;
use axum::http::{header, HeaderMap};
use socialapp_auth::{InternalId, SessionRecord, SessionStore};
use std::time::Duration;

/// Why a handshake was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The cookie header could not be parsed or its signature is invalid.
    MalformedCredential,
    /// No live session matches the presented credential.
    SessionNotFound,
}

impl RejectReason {
    /// Client-facing message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MalformedCredential => "Malformed cookie transmitted",
            Self::SessionNotFound => "Failed to get session",
        }
    }
}

/// State attached to an admitted connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandshakeContext {
    /// Session presented by the client; `None` for anonymous connections.
    pub session: Option<SessionRecord>,
}

impl HandshakeContext {
    /// Returns `true` if no session was presented.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        self.session.is_none()
    }

    /// Identity bound to the session, if the user has logged in.
    #[must_use]
    pub fn internal_id(&self) -> Option<InternalId> {
        self.session.as_ref().and_then(|session| session.internal_id)
    }
}

/// Result of authenticating a handshake.
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeOutcome {
    /// Upgrade may proceed with this context.
    Admit(HandshakeContext),
    /// Upgrade must be refused.
    Reject(RejectReason),
}

/// Authenticates WebSocket handshakes against the shared session store.
#[derive(Debug, Clone)]
pub struct HandshakeAuthenticator<S> {
    store: S,
    cookies: SessionCookies,
    timeout: Duration,
}

impl<S: SessionStore> HandshakeAuthenticator<S> {
    /// Create an authenticator.
    ///
    /// # Arguments
    ///
    /// * `store` - Session store shared with the conventional request layer
    /// * `cookies` - Verifier for the signed session cookie
    /// * `timeout` - Upper bound for the session lookup
    #[must_use]
    pub const fn new(store: S, cookies: SessionCookies, timeout: Duration) -> Self {
        Self {
            store,
            cookies,
            timeout,
        }
    }

    /// Signed-cookie verifier used by this authenticator.
    #[must_use]
    pub const fn cookies(&self) -> &SessionCookies {
        &self.cookies
    }

    /// Session store used by this authenticator.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Decide whether a handshake with these request headers is admitted.
    ///
    /// Never fails: every error becomes a [`HandshakeOutcome::Reject`].
    pub async fn authenticate_handshake(&self, headers: &HeaderMap) -> HandshakeOutcome {
        let mut values = headers.get_all(header::COOKIE).iter().peekable();
        if values.peek().is_none() {
            tracing::debug!("Handshake without cookie admitted anonymously");
            return HandshakeOutcome::Admit(HandshakeContext::default());
        }

        let mut raw = Vec::new();
        for value in values {
            match value.to_str() {
                Ok(text) => raw.push(text),
                Err(_) => {
                    tracing::warn!("Rejected handshake: cookie header is not visible ASCII");
                    return HandshakeOutcome::Reject(RejectReason::MalformedCredential);
                }
            }
        }

        let session_id = match self.cookies.verify(&raw.join("; ")) {
            Ok(Some(session_id)) => session_id,
            Ok(None) => {
                tracing::warn!(
                    cookie = %self.cookies.name(),
                    "Rejected handshake: session cookie absent"
                );
                return HandshakeOutcome::Reject(RejectReason::SessionNotFound);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Rejected handshake: malformed credential");
                return HandshakeOutcome::Reject(RejectReason::MalformedCredential);
            }
        };

        match tokio::time::timeout(self.timeout, self.store.get_session(&session_id)).await {
            Ok(Ok(Some(session))) => {
                tracing::info!(
                    session_id = %session_id,
                    internal_id = ?session.internal_id,
                    "Handshake admitted"
                );
                HandshakeOutcome::Admit(HandshakeContext {
                    session: Some(session),
                })
            }
            Ok(Ok(None)) => {
                tracing::warn!(session_id = %session_id, "Rejected handshake: no such session");
                HandshakeOutcome::Reject(RejectReason::SessionNotFound)
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    session_id = %session_id,
                    error = %e,
                    "Rejected handshake: session lookup failed"
                );
                HandshakeOutcome::Reject(RejectReason::SessionNotFound)
            }
            Err(_) => {
                tracing::warn!(
                    session_id = %session_id,
                    timeout = ?self.timeout,
                    "Rejected handshake: session lookup timed out"
                );
                HandshakeOutcome::Reject(RejectReason::SessionNotFound)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use socialapp_auth::mocks::MockSessionStore;
    use socialapp_auth::SessionId;

    fn authenticator(store: &MockSessionStore) -> HandshakeAuthenticator<MockSessionStore> {
        HandshakeAuthenticator::new(
            store.clone(),
            SessionCookies::new("socialapp.sid", b"the secret"),
            Duration::from_millis(50),
        )
    }

    fn cookie_headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    async fn stored_session(store: &MockSessionStore) -> SessionRecord {
        let session = SessionRecord::new(SessionId::generate(), chrono::Duration::hours(1))
            .with_identity(InternalId(7));
        store.save_session(&session).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_no_cookie_admits_anonymous() {
        let store = MockSessionStore::new();
        let outcome = authenticator(&store)
            .authenticate_handshake(&HeaderMap::new())
            .await;

        let HandshakeOutcome::Admit(context) = outcome else {
            unreachable!("expected admission, got {outcome:?}");
        };
        assert!(context.is_anonymous());
        assert_eq!(context.internal_id(), None);
    }

    #[tokio::test]
    async fn test_valid_cookie_with_session_admits() {
        let store = MockSessionStore::new();
        let auth = authenticator(&store);
        let session = stored_session(&store).await;
        let cookie = auth.cookies().header_value(&session.session_id);

        let outcome = auth
            .authenticate_handshake(&cookie_headers(&cookie))
            .await;

        assert_eq!(
            outcome,
            HandshakeOutcome::Admit(HandshakeContext {
                session: Some(session)
            })
        );
    }

    #[tokio::test]
    async fn test_valid_cookie_without_session_rejects() {
        let store = MockSessionStore::new();
        let auth = authenticator(&store);
        let cookie = auth.cookies().header_value(&SessionId::generate());

        let outcome = auth
            .authenticate_handshake(&cookie_headers(&cookie))
            .await;
        assert_eq!(outcome, HandshakeOutcome::Reject(RejectReason::SessionNotFound));
    }

    #[tokio::test]
    async fn test_unsigned_cookie_rejects_as_malformed() {
        let store = MockSessionStore::new();
        let session = stored_session(&store).await;

        let outcome = authenticator(&store)
            .authenticate_handshake(&cookie_headers(&format!(
                "socialapp.sid={}",
                session.session_id
            )))
            .await;
        assert_eq!(
            outcome,
            HandshakeOutcome::Reject(RejectReason::MalformedCredential)
        );
    }

    #[tokio::test]
    async fn test_unparsable_session_cookie_rejects_as_malformed() {
        let store = MockSessionStore::new();
        let outcome = authenticator(&store)
            .authenticate_handshake(&cookie_headers("socialapp.sid=%FF"))
            .await;
        assert_eq!(
            outcome,
            HandshakeOutcome::Reject(RejectReason::MalformedCredential)
        );
    }

    #[tokio::test]
    async fn test_unparsable_foreign_pair_does_not_block_admission() {
        let store = MockSessionStore::new();
        let auth = authenticator(&store);
        let session = stored_session(&store).await;
        let cookie = auth.cookies().header_value(&session.session_id);

        let outcome = auth
            .authenticate_handshake(&cookie_headers(&format!("flag; {cookie}")))
            .await;
        assert_eq!(
            outcome,
            HandshakeOutcome::Admit(HandshakeContext {
                session: Some(session)
            })
        );
    }

    #[tokio::test]
    async fn test_other_cookies_only_rejects() {
        let store = MockSessionStore::new();
        let outcome = authenticator(&store)
            .authenticate_handshake(&cookie_headers("theme=dark"))
            .await;
        assert_eq!(outcome, HandshakeOutcome::Reject(RejectReason::SessionNotFound));
    }

    #[tokio::test]
    async fn test_split_cookie_headers_are_combined() {
        let store = MockSessionStore::new();
        let auth = authenticator(&store);
        let session = stored_session(&store).await;
        let cookie = auth.cookies().header_value(&session.session_id);

        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            header::COOKIE,
            HeaderValue::from_str(&cookie).unwrap(),
        );

        assert!(matches!(
            auth.authenticate_handshake(&headers).await,
            HandshakeOutcome::Admit(_)
        ));
    }

    #[tokio::test]
    async fn test_store_error_rejects() {
        let store = MockSessionStore::new();
        let auth = authenticator(&store);
        let session = stored_session(&store).await;
        let cookie = auth.cookies().header_value(&session.session_id);
        store.set_unavailable(true);

        let outcome = auth
            .authenticate_handshake(&cookie_headers(&cookie))
            .await;
        assert_eq!(outcome, HandshakeOutcome::Reject(RejectReason::SessionNotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout_rejects() {
        let store = MockSessionStore::new();
        let auth = authenticator(&store);
        let session = stored_session(&store).await;
        let cookie = auth.cookies().header_value(&session.session_id);
        store.set_latency(Some(Duration::from_secs(5))).unwrap();

        let outcome = auth
            .authenticate_handshake(&cookie_headers(&cookie))
            .await;
        assert_eq!(outcome, HandshakeOutcome::Reject(RejectReason::SessionNotFound));
    }

    #[test]
    fn test_reject_messages() {
        assert_eq!(
            RejectReason::MalformedCredential.message(),
            "Malformed cookie transmitted"
        );
        assert_eq!(RejectReason::SessionNotFound.message(), "Failed to get session");
    }
}
