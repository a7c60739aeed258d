//! Retrieval adapters.
//!
//! Implementations of the `RetrievalService` port:
//!
//! - `http` - JSON/HTTP client for the retrieval backend
//! - `in_memory` - Fixed records for tests and local development

mod http;
mod in_memory;

pub use http::HttpRetrievalService;
pub use in_memory::InMemoryRetrievalService;
