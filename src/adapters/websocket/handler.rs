//! WebSocket upgrade handler for the chat channel.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Authenticate the bearer token (query param or header), refusing with 401
//! 2. Upgrade to WebSocket
//! 3. Register the session and send `connected`
//! 4. Dispatch client messages until disconnect
//! 5. Cancel in-flight work and unregister

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::domain::foundation::{AuthError, UserId};
use crate::domain::query::{QueryErrorCode, QueryState};
use crate::ports::TokenAuthenticator;

use super::emitter::{run_writer, FrameEmitter};
use super::keepalive::answer_ping;
use super::messages::{ClientMessage, ConnectedMessage, ServerMessage};
use super::query_session::{QueryServices, QuerySession};
use super::registry::SessionRegistry;

/// State required for WebSocket handling.
///
/// Extracted from the application state.
#[derive(Clone)]
pub struct ChatState {
    pub authenticator: Arc<dyn TokenAuthenticator>,
    pub registry: Arc<SessionRegistry>,
    pub services: Arc<QueryServices>,
    /// Frames buffered per channel.
    pub emitter_capacity: usize,
}

/// Query string accepted on the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct HandshakeParams {
    pub token: Option<String>,
}

/// Pull the bearer token from `?token=` or the `Authorization` header.
///
/// The query parameter wins when both are present.
pub fn extract_token<'a>(params: &'a HandshakeParams, headers: &'a HeaderMap) -> Option<&'a str> {
    params
        .token
        .as_deref()
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
        })
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// 401 sent for every handshake failure, whatever the reason.
fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": {
                "code": "UNAUTHORIZED",
                "message": "Unauthorized"
            }
        })),
    )
        .into_response()
}

/// Handle WebSocket upgrade requests for the chat channel.
///
/// Route: `GET /ws/chat?token=<jwt>` or with `Authorization: Bearer <jwt>`.
///
/// Authentication happens before the upgrade. A refused handshake gets a
/// plain 401 and never sees a frame.
pub async fn ws_chat_handler(
    State(state): State<ChatState>,
    Query(params): Query<HandshakeParams>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let user_id = match extract_token(&params, &headers) {
        Some(token) => state.authenticator.authenticate(token).await,
        None => Err(AuthError::MissingToken),
    };
    let user_id = match user_id {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::warn!(reason = e.reason(), "Chat handshake refused");
            return unauthorized();
        }
    };

    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, user_id, state)),
        Err(rejection) => rejection.into_response(),
    }
}

/// Handle an established WebSocket connection.
///
/// Runs for the lifetime of the connection. The writer task owns the sink;
/// this task owns the receive half and the session's query driver.
async fn handle_socket(socket: WebSocket, user_id: UserId, state: ChatState) {
    let (sink, mut receiver) = socket.split();

    let cancel = CancellationToken::new();
    let (emitter, frames) = FrameEmitter::new(state.emitter_capacity, cancel.clone());
    let (state_tx, state_rx) = watch::channel(QueryState::Idle);

    let session = state
        .registry
        .open(user_id, emitter.clone(), state_rx, cancel.clone())
        .await;
    let session_id = session.id;

    let writer = tokio::spawn(run_writer(sink, frames, cancel.clone(), session_id));

    let connected = ServerMessage::Connected(ConnectedMessage {
        session_id,
        user_id,
        message: "Connected to SmartHealth chat".to_string(),
    });
    if let Err(e) = emitter.emit(connected).await {
        tracing::debug!(%session_id, "Failed to send connected message: {}", e);
        state.registry.close(&session_id).await;
        return;
    }

    let queries = QuerySession::new(
        session_id,
        user_id,
        emitter.clone(),
        state_tx,
        state.services.clone(),
        cancel.clone(),
    );

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = receiver.next() => next,
        };

        let Some(result) = next else {
            tracing::debug!(%session_id, "Client stream ended");
            break;
        };

        let delivered = match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Query(query)) => queries.submit(query).await.map(|_| ()),
                Ok(ClientMessage::Ping) => answer_ping(&emitter, session_id).await,
                Err(e) => {
                    tracing::debug!(%session_id, "Unparseable client message: {}", e);
                    emitter
                        .emit(ServerMessage::error(session_id, QueryErrorCode::InvalidMessage))
                        .await
                }
            },
            Ok(Message::Binary(_)) => {
                tracing::warn!(%session_id, "Received unsupported binary message");
                Ok(())
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Protocol-level heartbeat, answered by axum
                Ok(())
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(%session_id, "Client sent close frame");
                break;
            }
            Err(e) => {
                tracing::debug!(%session_id, "Receive error: {}", e);
                break;
            }
        };

        if delivered.is_err() {
            tracing::debug!(%session_id, "Channel closed while replying");
            break;
        }
    }

    // Cancels any in-flight query and stops the writer
    state.registry.close(&session_id).await;
    cancel.cancel();
    if let Err(e) = writer.await {
        tracing::debug!(%session_id, "Writer task ended abnormally: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn params(token: Option<&str>) -> HandshakeParams {
        HandshakeParams {
            token: token.map(str::to_string),
        }
    }

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Token Extraction
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn token_from_query_param() {
        let p = params(Some("abc"));
        assert_eq!(extract_token(&p, &HeaderMap::new()), Some("abc"));
    }

    #[test]
    fn token_from_bearer_header() {
        let p = params(None);
        let h = bearer("Bearer xyz");
        assert_eq!(extract_token(&p, &h), Some("xyz"));
    }

    #[test]
    fn query_param_wins_over_header() {
        let p = params(Some("from-query"));
        let h = bearer("Bearer from-header");
        assert_eq!(extract_token(&p, &h), Some("from-query"));
    }

    #[test]
    fn header_without_bearer_prefix_is_ignored() {
        let p = params(None);
        let h = bearer("Basic dXNlcjpwYXNz");
        assert_eq!(extract_token(&p, &h), None);
    }

    #[test]
    fn blank_token_counts_as_missing() {
        let p = params(Some("   "));
        assert_eq!(extract_token(&p, &HeaderMap::new()), None);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Rejection
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unauthorized_body_is_uniform() {
        let response = unauthorized();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"]["code"], "UNAUTHORIZED");
        assert_eq!(json["error"]["message"], "Unauthorized");
    }
}
