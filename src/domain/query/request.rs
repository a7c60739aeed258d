//! Validated patient question.

use crate::domain::foundation::ValidationError;

/// Default upper bound on question length, in characters.
pub const DEFAULT_MAX_QUESTION_LENGTH: usize = 2_000;

/// Upper bound on a patient document number, in characters.
pub const MAX_DOCUMENT_NUMBER_LENGTH: usize = 32;

/// A question about one patient, identified by document type and number.
///
/// Only constructible through [`QueryRequest::new`], so every instance that
/// reaches the query state machine has passed validation. Immutable after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    document_type_id: i64,
    document_number: String,
    question: String,
}

impl QueryRequest {
    /// Validates raw client input.
    ///
    /// The question and document number are trimmed; the question must be
    /// non-empty and at most `max_question_length` characters.
    pub fn new(
        document_type_id: i64,
        document_number: &str,
        question: &str,
        max_question_length: usize,
    ) -> Result<Self, ValidationError> {
        if document_type_id <= 0 {
            return Err(ValidationError::out_of_range(
                "document_type_id",
                1,
                i64::MAX,
                document_type_id,
            ));
        }

        let document_number = document_number.trim();
        if document_number.is_empty() {
            return Err(ValidationError::empty_field("document_number"));
        }
        if document_number.chars().count() > MAX_DOCUMENT_NUMBER_LENGTH {
            return Err(ValidationError::too_long(
                "document_number",
                MAX_DOCUMENT_NUMBER_LENGTH,
            ));
        }
        if !document_number
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ValidationError::invalid_format(
                "document_number",
                "only letters, digits and '-' are allowed",
            ));
        }

        let question = question.trim();
        if question.is_empty() {
            return Err(ValidationError::empty_field("question"));
        }
        if question.chars().count() > max_question_length {
            return Err(ValidationError::too_long("question", max_question_length));
        }

        Ok(Self {
            document_type_id,
            document_number: document_number.to_string(),
            question: question.to_string(),
        })
    }

    pub fn document_type_id(&self) -> i64 {
        self.document_type_id
    }

    pub fn document_number(&self) -> &str {
        &self.document_number
    }

    pub fn question(&self) -> &str {
        &self.question
    }
}
