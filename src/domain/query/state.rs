//! Per-channel query lifecycle.

use serde::Serialize;

use crate::domain::foundation::StateMachine;

/// Where a channel's current query stands.
///
/// `Complete` and `Error` end a query; the channel then returns to `Idle`
/// and can take the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryState {
    #[default]
    Idle,
    Retrieving,
    Streaming,
    Complete,
    Error,
}

impl QueryState {
    /// True while a query is in flight and new ones must be refused.
    pub fn is_busy(&self) -> bool {
        matches!(self, QueryState::Retrieving | QueryState::Streaming)
    }
}

impl StateMachine for QueryState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use QueryState::*;
        matches!(
            (self, target),
            (Idle, Retrieving)
                | (Idle, Error)
                | (Retrieving, Streaming)
                | (Retrieving, Error)
                | (Streaming, Complete)
                | (Streaming, Error)
                | (Complete, Idle)
                | (Error, Idle)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use QueryState::*;
        match self {
            Idle => vec![Retrieving, Error],
            Retrieving => vec![Streaming, Error],
            Streaming => vec![Complete, Error],
            Complete => vec![Idle],
            Error => vec![Idle],
        }
    }
}
