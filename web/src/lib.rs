//! Session bridge between conventional HTTP sessions and WebSockets.
//!
//! The conventional request layer logs users in and stores their sessions in
//! Redis behind a signed cookie. This crate lets a WebSocket endpoint,
//! possibly served by a different process, trust that same cookie.
//!
//! # Request Flow
//!
//! 1. **Upgrade request** arrives at `/ws` with the browser's cookies
//! 2. **Verify** the signed session cookie ([`SessionCookies`])
//! 3. **Load** the session from the shared store ([`HandshakeAuthenticator`])
//! 4. **Refuse** with `401`, or **resolve** the session's identity
//! 5. **Upgrade** and greet the client
//!
//! # Example
//!
//! ```no_run
//! use socialapp_web::{router, AppState, SocialAppConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SocialAppConfig::from_env();
//! let state = AppState::connect(&config).await?;
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router(state)).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod cookies;
pub mod error;
pub mod handlers;
pub mod handshake;
pub mod middleware;
pub mod state;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use socialapp_auth::{KeyValueStore, SessionStore};
use tower_http::trace::TraceLayer;

// Re-export key types for convenience
pub use config::{SessionBridgeConfig, SocialAppConfig};
pub use cookies::{CookieError, SessionCookies};
pub use error::AppError;
pub use handshake::{HandshakeAuthenticator, HandshakeContext, HandshakeOutcome, RejectReason};
pub use state::AppState;

/// Path of the WebSocket endpoint.
pub const WS_PATH: &str = "/ws";

/// Build the bridge router.
///
/// The handshake gate is a route layer, so it only runs for matched routes
/// and always before the upgrade extractor.
pub fn router<K, S>(state: AppState<K, S>) -> Router
where
    K: KeyValueStore + 'static,
    S: SessionStore + 'static,
{
    Router::new()
        .route(WS_PATH, get(handlers::websocket::handle::<K, S>))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::require_handshake::<K, S>,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
