//! Machine-readable error codes sent to clients.

use serde::Serialize;
use std::fmt;

/// Stable code carried by every `error` frame.
///
/// Only the code and [`QueryErrorCode::safe_message`] cross the channel
/// boundary; internal detail stays in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryErrorCode {
    /// The query failed input validation.
    ValidationError,
    /// No patient or document matches the requested identifiers.
    NotFound,
    /// The retrieval backend failed or timed out.
    RetrievalError,
    /// The language model failed, timed out, or returned an unusable answer.
    ProviderError,
    /// A query is already in flight on this session.
    SessionBusy,
    /// The client message could not be parsed.
    InvalidMessage,
    /// Unexpected server-side failure.
    InternalError,
}

impl QueryErrorCode {
    /// Fixed client-facing message for codes whose detail must not leak.
    pub fn safe_message(&self) -> &'static str {
        match self {
            QueryErrorCode::ValidationError => "The query is invalid",
            QueryErrorCode::NotFound => "No records found for the requested patient",
            QueryErrorCode::RetrievalError => "Clinical records are temporarily unavailable",
            QueryErrorCode::ProviderError => "The answer could not be generated",
            QueryErrorCode::SessionBusy => "A query is already in progress for this session",
            QueryErrorCode::InvalidMessage => "Message could not be understood",
            QueryErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryErrorCode::ValidationError => "VALIDATION_ERROR",
            QueryErrorCode::NotFound => "NOT_FOUND",
            QueryErrorCode::RetrievalError => "RETRIEVAL_ERROR",
            QueryErrorCode::ProviderError => "PROVIDER_ERROR",
            QueryErrorCode::SessionBusy => "SESSION_BUSY",
            QueryErrorCode::InvalidMessage => "INVALID_MESSAGE",
            QueryErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}
