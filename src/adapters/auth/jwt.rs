//! HS256 bearer token adapter.
//!
//! Implements the `TokenAuthenticator` port for tokens signed with a shared
//! secret, as issued by the SmartHealth login endpoint:
//!
//! ```json
//! { "sub": "42", "exp": 1735689600 }
//! ```
//!
//! Validation checks the signature, the algorithm, and the expiry (with a
//! configurable leeway), then resolves `sub` to a [`UserId`].

use async_trait::async_trait;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::AuthConfig;
use crate::domain::foundation::{AuthError, UserId};
use crate::ports::TokenAuthenticator;

/// Claims we read from the token. Everything else is ignored.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: Subject,
    #[allow(dead_code)]
    exp: u64,
}

/// Some issuers encode the subject as a JSON number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Subject {
    Text(String),
    Number(i64),
}

impl Subject {
    fn to_user_id(&self) -> Option<UserId> {
        match self {
            Subject::Text(raw) => raw.parse().ok(),
            Subject::Number(n) => UserId::new(*n).ok(),
        }
    }
}

/// Validates HS256 tokens against a shared secret.
#[derive(Clone)]
pub struct JwtTokenAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenAuthenticator {
    /// Creates an authenticator for `secret` with the given clock leeway.
    pub fn new(secret: &SecretString, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }

    /// Creates an authenticator from application configuration.
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.leeway_secs)
    }
}

#[async_trait]
impl TokenAuthenticator for JwtTokenAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }

        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    AuthError::ExpiredToken
                }
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    tracing::warn!("Token signature rejected: {}", e);
                    AuthError::InvalidSignature
                }
                _ => {
                    tracing::debug!("Malformed token: {}", e);
                    AuthError::MalformedToken
                }
            }
        })?;

        data.claims.sub.to_user_id().ok_or_else(|| {
            tracing::warn!(sub = ?data.claims.sub, "Token subject is not a valid user id");
            AuthError::MalformedToken
        })
    }
}

impl std::fmt::Debug for JwtTokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenAuthenticator")
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}
