//! Per-channel query session limits

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::query::DEFAULT_MAX_QUESTION_LENGTH;

/// Limits applied to every chat channel.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Upper bound on context retrieval
    #[serde(default = "default_retrieval_timeout")]
    pub retrieval_timeout_secs: u64,

    /// Upper bound on answer generation, streaming included
    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_secs: u64,

    /// Frames buffered per channel before producers wait
    #[serde(default = "default_emitter_capacity")]
    pub emitter_capacity: usize,

    /// Maximum question length in characters
    #[serde(default = "default_max_question_length")]
    pub max_question_length: usize,
}

impl SessionConfig {
    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieval_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Validate session limits
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.retrieval_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout(
                "session.retrieval_timeout_secs",
            ));
        }
        if self.generation_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout(
                "session.generation_timeout_secs",
            ));
        }
        if self.emitter_capacity == 0 {
            return Err(ValidationError::InvalidEmitterCapacity);
        }
        if self.max_question_length == 0 {
            return Err(ValidationError::InvalidQuestionLength);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retrieval_timeout_secs: default_retrieval_timeout(),
            generation_timeout_secs: default_generation_timeout(),
            emitter_capacity: default_emitter_capacity(),
            max_question_length: default_max_question_length(),
        }
    }
}

fn default_retrieval_timeout() -> u64 {
    30
}

fn default_generation_timeout() -> u64 {
    60
}

fn default_emitter_capacity() -> usize {
    256
}

fn default_max_question_length() -> usize {
    DEFAULT_MAX_QUESTION_LENGTH
}
