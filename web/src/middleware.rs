//! Axum middleware gating WebSocket upgrades.
//!
//! Runs the handshake authenticator before the upgrade extractor, so a
//! rejected client never gets a connection:
//!
//! 1. **Authenticate** the request's `Cookie` headers
//! 2. **Reject** with `401` and a JSON error body, or
//! 3. **Store** the [`HandshakeContext`] in request extensions and continue
//!
//! # Example
//!
//! ```ignore
//! use axum::{middleware::from_fn_with_state, routing::get, Router};
//! use socialapp_web::middleware::require_handshake;
//!
//! let app = Router::new()
//!     .route("/ws", get(websocket::handle::<K, S>))
//!     .route_layer(from_fn_with_state(state.clone(), require_handshake::<K, S>))
//!     .with_state(state);
//! ```
//!
//! [`HandshakeContext`]: crate::handshake::HandshakeContext

use crate::error::AppError;
use crate::handshake::HandshakeOutcome;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use socialapp_auth::{KeyValueStore, SessionStore};

/// Admit or refuse a handshake request.
pub async fn require_handshake<K, S>(
    State(state): State<AppState<K, S>>,
    request: Request,
    next: Next,
) -> Response
where
    K: KeyValueStore + 'static,
    S: SessionStore + 'static,
{
    // The body is not `Sync`; only the parts are borrowed across the lookup
    let (mut parts, body) = request.into_parts();

    match state.authenticator.authenticate_handshake(&parts.headers).await {
        HandshakeOutcome::Admit(context) => {
            parts.extensions.insert(context);
            next.run(Request::from_parts(parts, body)).await
        }
        HandshakeOutcome::Reject(reason) => AppError::handshake_rejected(reason).into_response(),
    }
}
