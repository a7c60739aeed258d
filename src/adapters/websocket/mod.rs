//! WebSocket adapters for the streaming chat channel.
//!
//! # Architecture
//!
//! ```text
//!            GET /ws/chat (JWT checked before upgrade)
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        handle_socket                                 │
//! │   receive loop ── query ──► QuerySession ──► retrieval + generation │
//! │        │                          │                                  │
//! │        └── ping ──► keepalive     │                                  │
//! │                │                  │                                  │
//! │                ▼                  ▼                                  │
//! │             FrameEmitter (bounded queue, one writer task)            │
//! └─────────────────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//!                SessionRegistry (one entry per open channel)
//! ```
//!
//! # Components
//!
//! - [`messages`] - wire protocol types
//! - [`emitter`] - ordered per-channel frame emission
//! - [`registry`] - live session map
//! - [`query_session`] - per-channel query state machine driver
//! - [`keepalive`] - application-level ping/pong
//! - [`handler`] - axum upgrade handler and connection loop

pub mod emitter;
pub mod handler;
pub mod keepalive;
pub mod messages;
pub mod query_session;
pub mod registry;

pub use emitter::{run_writer, EmitError, FrameEmitter};
pub use handler::{extract_token, ws_chat_handler, ChatState, HandshakeParams};
pub use keepalive::answer_ping;
pub use messages::{
    ClientMessage, CompleteMessage, ConnectedMessage, ErrorBody, ErrorMessage, PongMessage,
    QueryMessage, ServerMessage, StatusMessage, TokenMessage,
};
pub use query_session::{QueryFailure, QueryServices, QuerySession};
pub use registry::{RegistryError, Session, SessionRegistry};
