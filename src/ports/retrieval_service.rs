//! Retrieval port - clinical context assembly for one patient.
//!
//! The retrieval collaborator resolves a patient from document type and
//! number, loads their records and selects the vector chunks most relevant
//! to the question. The query session only sees the assembled context text
//! and a few counters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::query::{PatientInfo, QueryRequest};

/// Port for assembling question-specific clinical context.
#[async_trait]
pub trait RetrievalService: Send + Sync {
    /// Assemble context for `request`.
    ///
    /// # Returns
    ///
    /// * `Ok(RetrievedContext)` - context text plus retrieval statistics
    /// * `Err(RetrievalError::NotFound)` - no patient/document matches
    /// * `Err(RetrievalError::Unavailable)` - backing store unreachable
    async fn retrieve(&self, request: &RetrievalRequest) -> Result<RetrievedContext, RetrievalError>;
}

/// What the retrieval collaborator is asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrievalRequest {
    pub document_type_id: i64,
    pub document_number: String,
    pub question: String,
}

impl From<&QueryRequest> for RetrievalRequest {
    fn from(query: &QueryRequest) -> Self {
        Self {
            document_type_id: query.document_type_id(),
            document_number: query.document_number().to_string(),
            question: query.question().to_string(),
        }
    }
}

/// Context assembled for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedContext {
    pub patient: PatientInfo,
    pub context: String,
    pub records_analyzed: u32,
    pub chunks_used: u32,
}

/// Retrieval failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetrievalError {
    /// No patient or document matches the identifiers.
    #[error("no patient found for document {document_type_id}/{document_number}")]
    NotFound {
        document_type_id: i64,
        document_number: String,
    },

    /// The backing store could not be reached or answered with garbage.
    #[error("retrieval backend unavailable: {0}")]
    Unavailable(String),
}

impl RetrievalError {
    /// Creates a not-found error for the given request.
    pub fn not_found(request: &RetrievalRequest) -> Self {
        Self::NotFound {
            document_type_id: request.document_type_id,
            document_number: request.document_number.clone(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}
