//! Results produced by a completed query.

use serde::{Deserialize, Serialize};

/// The generated answer to one question. Never mutated after emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerResult {
    pub text: String,
    /// Informational score supplied by the provider configuration, in [0, 1].
    pub confidence: f64,
    pub model_used: String,
    pub tokens_used: u32,
}

/// Identity of the patient the context was assembled for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub full_name: String,
    pub document_type: String,
    pub document_number: String,
}

/// Retrieval and generation statistics reported alongside the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryMetadata {
    pub total_records_analyzed: u32,
    pub vector_chunks_used: u32,
    pub tokens_used: u32,
    pub processing_time_ms: u64,
}
