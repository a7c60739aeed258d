//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `ai` - LLM providers (OpenAI, mock)
//! - `auth` - bearer token validation (HS256 JWT)
//! - `retrieval` - clinical context retrieval (HTTP, in-memory)
//! - `websocket` - streaming chat channel
//! - `http` - router assembly and service endpoints

pub mod ai;
pub mod auth;
pub mod http;
pub mod retrieval;
pub mod websocket;

pub use http::{app_router, AppState};
