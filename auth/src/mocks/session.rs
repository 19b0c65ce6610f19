//! Mock session store for testing.

use crate::error::{AuthError, Result};
use crate::providers::SessionStore;
use crate::state::{SessionId, SessionRecord};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock session store.
///
/// Uses in-memory storage for testing. Failure and latency can be injected
/// to exercise the handshake's error and timeout paths.
#[derive(Debug, Clone, Default)]
pub struct MockSessionStore {
    sessions: Arc<Mutex<HashMap<SessionId, SessionRecord>>>,
    unavailable: Arc<AtomicBool>,
    latency: Arc<Mutex<Option<Duration>>>,
}

impl MockSessionStore {
    /// Create a new mock session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every subsequent read by `latency`.
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn set_latency(&self, latency: Option<Duration>) -> Result<()> {
        *self
            .latency
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))? = latency;
        Ok(())
    }

    /// Get count of stored sessions (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn session_count(&self) -> Result<usize> {
        Ok(self
            .sessions
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
            .len())
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::StoreUnavailable(
                "Mock session store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl SessionStore for MockSessionStore {
    fn get_session(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<Option<SessionRecord>>> + Send {
        let available = self.check_available();
        let sessions = Arc::clone(&self.sessions);
        let latency = self
            .latency
            .lock()
            .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))
            .map(|latency| *latency);
        let session_id = session_id.clone();

        async move {
            if let Some(delay) = latency? {
                tokio::time::sleep(delay).await;
            }
            available?;

            let sessions_guard = sessions
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?;

            Ok(sessions_guard
                .get(&session_id)
                .filter(|session| !session.is_expired())
                .cloned())
        }
    }

    fn save_session(&self, session: &SessionRecord) -> impl Future<Output = Result<()>> + Send {
        let available = self.check_available();
        let sessions = Arc::clone(&self.sessions);
        let session = session.clone();

        async move {
            available?;
            sessions
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
                .insert(session.session_id.clone(), session);
            Ok(())
        }
    }

    fn delete_session(&self, session_id: &SessionId) -> impl Future<Output = Result<()>> + Send {
        let available = self.check_available();
        let sessions = Arc::clone(&self.sessions);
        let session_id = session_id.clone();

        async move {
            available?;
            sessions
                .lock()
                .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))?
                .remove(&session_id);
            Ok(())
        }
    }
}
