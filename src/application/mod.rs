//! Application layer - answer generation over the ports.
//!
//! - `prompt` - system prompt and user message layout
//! - `answer` - provider-agnostic answer stream (streaming or single token)

pub mod answer;
pub mod prompt;

pub use answer::{
    validate_answer, AnswerEvent, AnswerGenerator, AnswerStream, GenerationSettings,
    MIN_ANSWER_CHARS,
};
