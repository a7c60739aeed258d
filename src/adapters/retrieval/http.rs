//! HTTP Retrieval Adapter
//!
//! Calls the retrieval backend over JSON/HTTP:
//!
//! ```text
//! POST {base_url}/retrieve
//! { "document_type_id": 8, "document_number": "30995750", "question": "..." }
//!
//! 200 -> { "patient": {...}, "context": "...", "records_analyzed": 4, "chunks_used": 3 }
//! 404 -> patient or document not found
//! ```

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::config::RetrievalConfig;
use crate::ports::{RetrievalError, RetrievalRequest, RetrievalService, RetrievedContext};

/// Retrieval service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRetrievalService {
    client: Client,
    base_url: String,
}

impl HttpRetrievalService {
    /// Creates a client for `config.base_url` with the configured timeout.
    pub fn new(config: &RetrievalConfig) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RetrievalError::unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn retrieve_url(&self) -> String {
        format!("{}/retrieve", self.base_url)
    }
}

#[async_trait]
impl RetrievalService for HttpRetrievalService {
    async fn retrieve(&self, request: &RetrievalRequest) -> Result<RetrievedContext, RetrievalError> {
        let response = self
            .client
            .post(self.retrieve_url())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Retrieval request failed");
                RetrievalError::unavailable(e.to_string())
            })?;

        match response.status() {
            status if status.is_success() => response.json::<RetrievedContext>().await.map_err(|e| {
                tracing::warn!(error = %e, "Retrieval response could not be parsed");
                RetrievalError::unavailable(format!("Invalid retrieval response: {}", e))
            }),
            StatusCode::NOT_FOUND => Err(RetrievalError::not_found(request)),
            status => {
                tracing::warn!(status = status.as_u16(), "Retrieval backend returned an error");
                Err(RetrievalError::unavailable(format!(
                    "Retrieval backend returned {}",
                    status
                )))
            }
        }
    }
}
