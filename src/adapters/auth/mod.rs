//! Authentication adapters.
//!
//! Implementations of the `TokenAuthenticator` port:
//!
//! - `jwt` - HS256 shared-secret tokens

mod jwt;

pub use jwt::JwtTokenAuthenticator;
