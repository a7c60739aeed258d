//! Per-channel frame emitter.
//!
//! Every producer on a channel (query driver, keep-alive, connection loop)
//! holds a clone of the same [`FrameEmitter`]. Frames go through one bounded
//! queue that a single writer task drains into the socket, so frames reach
//! the client in the order `emit` was called.
//!
//! ```text
//! query task ──┐
//! receive loop ┼──► mpsc ──► run_writer ──► WebSocket sink
//! keep-alive ──┘
//! ```
//!
//! A failed socket write cancels the channel token. After that every `emit`
//! returns [`EmitError::ChannelClosed`] and writes nothing.

use std::fmt::Display;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::foundation::SessionId;

use super::messages::ServerMessage;

/// Emission failed because the channel is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("channel closed")]
    ChannelClosed,
}

/// Cloneable handle for sending frames to one client.
#[derive(Debug, Clone)]
pub struct FrameEmitter {
    tx: mpsc::Sender<ServerMessage>,
    closed: CancellationToken,
}

impl FrameEmitter {
    /// Creates an emitter bound to `closed` and the queue its writer drains.
    pub fn new(capacity: usize, closed: CancellationToken) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, closed }, rx)
    }

    /// Emitter with its own token, for driving a session without a socket.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        Self::new(capacity, CancellationToken::new())
    }

    /// Queue `frame` for writing.
    ///
    /// Waits while the queue is full. Returns `ChannelClosed` without
    /// queuing anything once the channel is closed.
    pub async fn emit(&self, frame: ServerMessage) -> Result<(), EmitError> {
        if self.closed.is_cancelled() {
            tracing::debug!(kind = frame.kind(), "Discarding frame for closed channel");
            return Err(EmitError::ChannelClosed);
        }

        let kind = frame.kind();
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => {
                tracing::debug!(kind, "Discarding frame for closed channel");
                Err(EmitError::ChannelClosed)
            }
            sent = self.tx.send(frame) => sent.map_err(|_| {
                tracing::debug!(kind, "Writer gone, discarding frame");
                EmitError::ChannelClosed
            }),
        }
    }

    /// True once the channel token has been cancelled.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

/// Drain `rx` into `sink` until the queue closes or `closed` is cancelled.
///
/// A write failure cancels `closed`, which stops every producer.
pub async fn run_writer<S>(
    mut sink: S,
    mut rx: mpsc::Receiver<ServerMessage>,
    closed: CancellationToken,
    session_id: SessionId,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    loop {
        let frame = tokio::select! {
            biased;
            _ = closed.cancelled() => None,
            frame = rx.recv() => frame,
        };
        let Some(frame) = frame else {
            break;
        };

        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(%session_id, kind = frame.kind(), "Failed to serialize frame: {}", e);
                continue;
            }
        };

        if let Err(e) = sink.send(Message::Text(text)).await {
            tracing::debug!(%session_id, "Send error, closing channel: {}", e);
            closed.cancel();
            break;
        }
    }

    rx.close();
    if let Err(e) = sink.close().await {
        tracing::trace!(%session_id, "Close error: {}", e);
    }
}
