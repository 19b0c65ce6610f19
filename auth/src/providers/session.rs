//! Session store trait.

use crate::error::Result;
use crate::state::{SessionId, SessionRecord};

/// Session store.
///
/// This trait abstracts over the session storage shared with the
/// conventional request layer (Redis).
///
/// # Implementation Notes
///
/// - Expiry is owned by the store (TTL derived from `expires_at`)
/// - Records past `expires_at` read as absent
pub trait SessionStore: Send + Sync {
    /// Get session.
    ///
    /// # Returns
    ///
    /// The session if found and not expired.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network request fails
    /// - Stored session cannot be decoded
    fn get_session(
        &self,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<Option<SessionRecord>>> + Send;

    /// Create or replace a session.
    ///
    /// # Errors
    ///
    /// Returns error if network request fails.
    fn save_session(
        &self,
        session: &SessionRecord,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Delete session.
    ///
    /// # Errors
    ///
    /// Returns error if network request fails.
    fn delete_session(
        &self,
        session_id: &SessionId,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
