//! WebSocket message types for the chat channel.
//!
//! Defines the protocol between server and connected clients:
//! - Server → Client: connection status, query progress, answer tokens,
//!   final answer, errors, pongs
//! - Client → Server: queries, pings

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SessionId, UserId};
use crate::domain::query::{AnswerResult, PatientInfo, QueryErrorCode, QueryMetadata};

// ============================================
// Server → Client Messages
// ============================================

/// All message types that can be sent from server to client.
///
/// Per query the order is: zero or more `status`, `stream_start`, zero or
/// more `token`, `stream_end`, then exactly one of `complete` or `error`.
/// Failures before streaming skip straight to `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// First frame on every channel.
    Connected(ConnectedMessage),

    /// Human-readable progress update.
    Status(StatusMessage),

    /// Answer tokens follow.
    StreamStart,

    /// One fragment of the answer.
    Token(TokenMessage),

    /// No more tokens for this query.
    StreamEnd,

    /// Final answer with patient and retrieval metadata.
    Complete(CompleteMessage),

    /// Query failed or message rejected.
    Error(ErrorMessage),

    /// Heartbeat response.
    Pong(PongMessage),
}

impl ServerMessage {
    pub fn status(message: impl Into<String>) -> Self {
        ServerMessage::Status(StatusMessage {
            message: message.into(),
        })
    }

    pub fn token(token: impl Into<String>) -> Self {
        ServerMessage::Token(TokenMessage {
            token: token.into(),
        })
    }

    /// Error frame carrying the code's fixed client-facing message.
    pub fn error(session_id: SessionId, code: QueryErrorCode) -> Self {
        Self::error_with_message(session_id, code, code.safe_message())
    }

    /// Error frame with a custom message. Only for text that is safe to
    /// show clients, such as validation details.
    pub fn error_with_message(
        session_id: SessionId,
        code: QueryErrorCode,
        message: impl Into<String>,
    ) -> Self {
        ServerMessage::Error(ErrorMessage {
            session_id,
            error: ErrorBody {
                code,
                message: message.into(),
            },
        })
    }

    pub fn pong() -> Self {
        ServerMessage::Pong(PongMessage {
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// The `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Connected(_) => "connected",
            ServerMessage::Status(_) => "status",
            ServerMessage::StreamStart => "stream_start",
            ServerMessage::Token(_) => "token",
            ServerMessage::StreamEnd => "stream_end",
            ServerMessage::Complete(_) => "complete",
            ServerMessage::Error(_) => "error",
            ServerMessage::Pong(_) => "pong",
        }
    }
}

/// Sent once the handshake is authenticated and the session is registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectedMessage {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenMessage {
    pub token: String,
}

/// Final answer. `answer.text` equals the concatenation of the query's tokens.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompleteMessage {
    pub patient_info: PatientInfo,
    pub metadata: QueryMetadata,
    pub answer: AnswerResult,
}

/// Error message sent to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorMessage {
    pub session_id: SessionId,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: QueryErrorCode,
    pub message: String,
}

/// Heartbeat response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PongMessage {
    pub timestamp: String,
}

// ============================================
// Client → Server Messages
// ============================================

/// All message types that can be received from client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ask a question about one patient.
    Query(QueryMessage),

    /// Heartbeat request.
    Ping,
}

/// A question as sent by the client, before validation.
///
/// Missing fields default to empty values so they are reported as
/// validation errors instead of unparseable messages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryMessage {
    /// Client-side correlation tag. The server-assigned session id wins.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub document_type_id: i64,
    #[serde(default)]
    pub document_number: String,
    #[serde(default)]
    pub question: String,
}
