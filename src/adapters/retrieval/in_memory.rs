//! In-Memory Retrieval Adapter
//!
//! Serves pre-assembled clinical context keyed by document type and number.
//! Useful for testing and local development without the retrieval backend.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::query::PatientInfo;
use crate::ports::{RetrievalError, RetrievalRequest, RetrievalService, RetrievedContext};

/// In-memory retrieval service
#[derive(Debug, Clone, Default)]
pub struct InMemoryRetrievalService {
    records: HashMap<(i64, String), RetrievedContext>,
    delay: Duration,
    failure: Option<RetrievalError>,
    calls: Arc<AtomicUsize>,
}

impl InMemoryRetrievalService {
    /// Create an empty service. Every lookup is `NotFound`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register context for one patient.
    pub fn with_record(
        mut self,
        document_type_id: i64,
        document_number: impl Into<String>,
        context: RetrievedContext,
    ) -> Self {
        self.records
            .insert((document_type_id, document_number.into()), context);
        self
    }

    /// Register a patient with a short synthetic history.
    pub fn with_patient(
        self,
        document_type_id: i64,
        document_number: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Self {
        let document_number = document_number.into();
        let full_name = full_name.into();
        let context = RetrievedContext {
            patient: PatientInfo {
                full_name: full_name.clone(),
                document_type: document_type_label(document_type_id),
                document_number: document_number.clone(),
            },
            context: format!(
                "Patient: {full_name}\n\
                 2024-03-02 - Consultation with Dr. Rivera (General Medicine). \
                 Diagnosis: Type 2 diabetes mellitus (E11.9). Prescribed Metformin 850 mg.\n\
                 2024-06-18 - Follow-up. HbA1c 6.8%. Treatment unchanged."
            ),
            records_analyzed: 2,
            chunks_used: 2,
        };
        self.with_record(document_type_id, document_number, context)
    }

    /// Simulate backend latency on every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every call with `error`.
    pub fn with_failure(mut self, error: RetrievalError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Number of `retrieve` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn document_type_label(document_type_id: i64) -> String {
    match document_type_id {
        8 => "CD".to_string(),
        other => format!("type-{other}"),
    }
}

#[async_trait]
impl RetrievalService for InMemoryRetrievalService {
    async fn retrieve(&self, request: &RetrievalRequest) -> Result<RetrievedContext, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        if let Some(ref error) = self.failure {
            return Err(error.clone());
        }

        self.records
            .get(&(request.document_type_id, request.document_number.clone()))
            .cloned()
            .ok_or_else(|| RetrievalError::not_found(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(document_type_id: i64, document_number: &str) -> RetrievalRequest {
        RetrievalRequest {
            document_type_id,
            document_number: document_number.to_string(),
            question: "What medication?".to_string(),
        }
    }

    #[tokio::test]
    async fn returns_registered_patient() {
        let service = InMemoryRetrievalService::new().with_patient(8, "30995750", "Ana Gómez");

        let context = service.retrieve(&request(8, "30995750")).await.unwrap();

        assert_eq!(context.patient.full_name, "Ana Gómez");
        assert_eq!(context.patient.document_type, "CD");
        assert!(context.context.contains("Metformin"));
        assert_eq!(service.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_patient_is_not_found() {
        let service = InMemoryRetrievalService::new().with_patient(8, "30995750", "Ana Gómez");

        let err = service.retrieve(&request(1, "30995750")).await.unwrap_err();

        assert_eq!(
            err,
            RetrievalError::NotFound {
                document_type_id: 1,
                document_number: "30995750".to_string()
            }
        );
    }

    #[tokio::test]
    async fn injected_failure_wins() {
        let service = InMemoryRetrievalService::new()
            .with_patient(8, "1", "X")
            .with_failure(RetrievalError::unavailable("db down"));

        let err = service.retrieve(&request(8, "1")).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Unavailable(_)));
    }
}
