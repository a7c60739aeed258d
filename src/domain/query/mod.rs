//! Query domain: the validated request, its lifecycle states, the answer it
//! produces and the error codes it can end with.

mod answer;
mod error_code;
mod request;
mod state;

pub use answer::{AnswerResult, PatientInfo, QueryMetadata};
pub use error_code::QueryErrorCode;
pub use request::{QueryRequest, DEFAULT_MAX_QUESTION_LENGTH, MAX_DOCUMENT_NUMBER_LENGTH};
pub use state::QueryState;
