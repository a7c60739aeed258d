//! Token authentication port.
//!
//! Validates the bearer credential a client presents when opening a chat
//! channel. No channel is upgraded and no session is created unless this
//! returns `Ok`.
//!
//! # Contract
//!
//! Implementations must:
//! - Verify the signature against a known signing key
//! - Reject tokens whose expiry is in the past
//! - Resolve the subject claim to a [`UserId`]
//! - Have no side effects beyond logging

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, UserId};

/// Validates bearer credentials and extracts the user identity.
#[async_trait]
pub trait TokenAuthenticator: Send + Sync {
    /// Validate a raw token (without any `Bearer ` prefix).
    ///
    /// # Returns
    ///
    /// * `Ok(UserId)` - the embedded subject
    /// * `Err(AuthError::MalformedToken)` - cannot be parsed
    /// * `Err(AuthError::ExpiredToken)` - expiry in the past
    /// * `Err(AuthError::InvalidSignature)` - signature check failed
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError>;
}
