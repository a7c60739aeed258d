//! Authentication types for the domain layer.
//!
//! These types describe the outcome of validating a bearer credential at
//! channel-open time. They carry no provider dependencies; the JWT adapter
//! maps library-specific failures onto [`AuthError`].
//!
//! Every variant has the same outward effect (the handshake is refused with
//! a bare "unauthorized"); the distinction exists for logging only.

use thiserror::Error;

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credential was supplied with the handshake.
    #[error("Missing token")]
    MissingToken,

    /// The token cannot be parsed or lacks required claims.
    #[error("Malformed token")]
    MalformedToken,

    /// The token's expiry lies in the past.
    #[error("Token expired")]
    ExpiredToken,

    /// The signature does not verify against the signing key.
    #[error("Invalid token signature")]
    InvalidSignature,
}

impl AuthError {
    /// Stable label used in structured logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::ExpiredToken => "expired_token",
            AuthError::InvalidSignature => "invalid_signature",
        }
    }
}
