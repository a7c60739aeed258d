//! Process-wide registry of live chat sessions.
//!
//! # Architecture
//!
//! ```text
//! SessionRegistry
//! ├── session-1 → { user 7, emitter, state: Streaming }
//! ├── session-2 → { user 7, emitter, state: Idle }
//! └── session-3 → { user 12, emitter, state: Retrieving }
//! ```
//!
//! One entry per open channel. Entries are created after a successful
//! handshake and removed when the channel closes. The registry is owned by
//! the serving state and shared through `Arc`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;

use crate::domain::foundation::{SessionId, UserId};
use crate::domain::query::QueryState;

use super::emitter::FrameEmitter;

/// Snapshot of one live session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub emitter: FrameEmitter,
    /// Cancelled when the channel closes for any reason.
    pub cancel: CancellationToken,
    pub opened_at: DateTime<Utc>,
    state: watch::Receiver<QueryState>,
}

impl Session {
    /// Current query state as published by the session's driver.
    pub fn state(&self) -> QueryState {
        *self.state.borrow()
    }
}

/// Registry lookup errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("session {0} not found")]
    NotFound(SessionId),
}

/// Maps session ids to live sessions.
///
/// Mutation only happens through [`open`](Self::open) and
/// [`close`](Self::close) under the write lock.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session under a fresh, unused id.
    pub async fn open(
        &self,
        user_id: UserId,
        emitter: FrameEmitter,
        state: watch::Receiver<QueryState>,
        cancel: CancellationToken,
    ) -> Session {
        let mut sessions = self.sessions.write().await;

        let mut id = SessionId::new();
        while sessions.contains_key(&id) {
            id = SessionId::new();
        }

        let session = Session {
            id,
            user_id,
            emitter,
            cancel,
            opened_at: Utc::now(),
            state,
        };
        sessions.insert(id, session.clone());

        tracing::info!(
            session_id = %id,
            user_id = %user_id,
            active = sessions.len(),
            "Session opened"
        );
        session
    }

    /// Remove a session and cancel its channel.
    ///
    /// Idempotent: closing an unknown or already-closed id is a no-op.
    /// Returns whether a session was removed.
    pub async fn close(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id);

        match removed {
            Some(session) => {
                session.cancel.cancel();
                tracing::info!(
                    session_id = %id,
                    user_id = %session.user_id,
                    duration_ms = (Utc::now() - session.opened_at).num_milliseconds(),
                    "Session closed"
                );
                true
            }
            None => false,
        }
    }

    /// Look up a live session.
    pub async fn lookup(&self, id: &SessionId) -> Result<Session, RegistryError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(RegistryError::NotFound(*id))
    }

    /// Number of open sessions.
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Close every session. Used on shutdown.
    pub async fn close_all(&self) {
        let drained: Vec<Session> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        for session in &drained {
            session.cancel.cancel();
        }
        if !drained.is_empty() {
            tracing::info!(count = drained.len(), "Closed all sessions");
        }
    }
}
