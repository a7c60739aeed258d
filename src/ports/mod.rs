//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the query core and the outside world. Adapters implement these ports.
//!
//! - `TokenAuthenticator` - bearer credential validation at channel open
//! - `RetrievalService` - clinical context assembly for one patient
//! - `AIProvider` - hosted language model, streaming or not

mod ai_provider;
mod retrieval_service;
mod token_authenticator;

pub use ai_provider::{
    AIError, AIProvider, ChunkStream, CompletionRequest, CompletionResponse, FinishReason,
    Message, MessageRole, ProviderInfo, RequestMetadata, StreamChunk, TokenUsage,
};
pub use retrieval_service::{RetrievalError, RetrievalRequest, RetrievalService, RetrievedContext};
pub use token_authenticator::TokenAuthenticator;
