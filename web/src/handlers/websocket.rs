//! WebSocket handler for authenticated real-time connections.
//!
//! Only reached after [`require_handshake`](crate::middleware::require_handshake)
//! admitted the request, so the [`HandshakeContext`] extension is always set.
//!
//! # Message Protocol
//!
//! **Server → Client (on connect):**
//! ```json
//! { "type": "welcome", "anonymous": false, "internalId": 12, "username": "jedi4ever" }
//! ```
//!
//! **Client → Server / Server → Client (keep-alive):**
//! ```json
//! { "type": "ping" }   →   { "type": "pong" }
//! ```
//!
//! **Server → Client (Error):**
//! ```json
//! { "type": "error", "message": "Invalid message format" }
//! ```

use crate::error::AppError;
use crate::handshake::HandshakeContext;
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use serde::{Deserialize, Serialize};
use socialapp_auth::{IdentityRecord, InternalId, KeyValueStore, SessionStore};
use tracing::{debug, info, warn};

/// WebSocket message envelope for client-server communication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WsMessage {
    /// Greeting sent once the connection is open
    Welcome {
        /// `true` if no session was presented
        anonymous: bool,
        /// Identity bound to the session
        #[serde(rename = "internalId", skip_serializing_if = "Option::is_none", default)]
        internal_id: Option<InternalId>,
        /// Display name of that identity
        #[serde(skip_serializing_if = "Option::is_none", default)]
        username: Option<String>,
    },
    /// Error message
    Error {
        /// Error description
        message: String,
    },
    /// Ping message (keep-alive)
    Ping,
    /// Pong response
    Pong,
}

impl WsMessage {
    fn welcome(context: &HandshakeContext, identity: Option<&IdentityRecord>) -> Self {
        Self::Welcome {
            anonymous: context.is_anonymous(),
            internal_id: identity.map(|record| record.internal_id),
            username: identity.map(|record| record.username.clone()),
        }
    }
}

/// Upgrade an admitted handshake to a WebSocket.
///
/// Resolves the session's identity before upgrading, so store failures still
/// surface as HTTP errors.
///
/// # Errors
///
/// Returns error if the identity lookup fails.
pub async fn handle<K, S>(
    ws: WebSocketUpgrade,
    State(state): State<AppState<K, S>>,
    Extension(context): Extension<HandshakeContext>,
) -> Result<Response, AppError>
where
    K: KeyValueStore + 'static,
    S: SessionStore + 'static,
{
    let identity = match &context.session {
        Some(session) => state.directory.identity_for_session(session).await?,
        None => None,
    };

    info!(
        anonymous = context.is_anonymous(),
        internal_id = ?identity.as_ref().map(|record| record.internal_id),
        "WebSocket connection requested"
    );

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, context, identity)))
}

/// Handle WebSocket connection lifecycle.
async fn handle_socket(
    socket: WebSocket,
    context: HandshakeContext,
    identity: Option<IdentityRecord>,
) {
    let (mut sender, mut receiver) = socket.split();

    if send(&mut sender, &WsMessage::welcome(&context, identity.as_ref()))
        .await
        .is_err()
    {
        debug!("Client left before welcome");
        return;
    }

    while let Some(Ok(msg)) = receiver.next().await {
        let reply = match msg {
            Message::Text(text) => match serde_json::from_str::<WsMessage>(&text) {
                Ok(WsMessage::Ping) => Some(WsMessage::Pong),
                Ok(other) => {
                    warn!(?other, "Unexpected message type from client");
                    Some(WsMessage::Error {
                        message: "Unexpected message type".to_string(),
                    })
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse WebSocket message");
                    Some(WsMessage::Error {
                        message: "Invalid message format".to_string(),
                    })
                }
            },
            Message::Binary(_) => {
                warn!("Received unexpected binary message");
                None
            }
            // Axum answers protocol-level pings itself
            Message::Ping(_) | Message::Pong(_) => None,
            Message::Close(_) => {
                info!("Client requested close");
                break;
            }
        };

        if let Some(reply) = reply {
            if send(&mut sender, &reply).await.is_err() {
                break;
            }
        }
    }

    info!("WebSocket connection closed");
}

async fn send(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &WsMessage,
) -> Result<(), ()> {
    let json = serde_json::to_string(message).map_err(|e| {
        warn!(error = %e, "Failed to serialize message");
    })?;
    sender.send(Message::Text(json)).await.map_err(|_| ())
}
