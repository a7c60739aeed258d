//! Application-level heartbeat.
//!
//! `{"type":"ping"}` is answered from the receive loop through the channel's
//! emitter, so a pong can land between two tokens of a streaming answer
//! without the query driver noticing. Protocol-level ping frames never get
//! here; axum answers those itself.

use crate::domain::foundation::SessionId;

use super::emitter::{EmitError, FrameEmitter};
use super::messages::ServerMessage;

/// Reply to a client ping.
pub async fn answer_ping(emitter: &FrameEmitter, session_id: SessionId) -> Result<(), EmitError> {
    tracing::trace!(%session_id, "Received ping");
    emitter.emit(ServerMessage::pong()).await
}
