//! Answer generation over the `AIProvider` port.
//!
//! Turns a question plus retrieved context into a stream of answer events.
//! Providers that stream yield one token per non-empty delta. Providers that
//! don't yield the whole (trimmed) answer as a single token. Either way the
//! stream ends with [`AnswerEvent::Finished`].

use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;

use crate::config::AiConfig;
use crate::ports::{AIError, AIProvider, CompletionRequest, MessageRole, ProviderInfo, RequestMetadata};

use super::prompt::{user_message, SYSTEM_PROMPT};

/// Answers shorter than this (after trimming) are treated as provider failures.
pub const MIN_ANSWER_CHARS: usize = 10;

/// One step of a generated answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerEvent {
    /// A fragment of answer text, in generation order.
    Token(String),
    /// Generation finished.
    Finished { tokens_used: u32, model_used: String },
}

pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<AnswerEvent, AIError>> + Send>>;

/// Generation parameters applied to every question.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Reported with every answer; not computed.
    pub confidence: f64,
}

impl GenerationSettings {
    pub fn from_config(config: &AiConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            confidence: config.confidence,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            temperature: 0.3,
            confidence: 0.85,
        }
    }
}

/// Rejects empty or trivially short answers.
pub fn validate_answer(text: &str) -> Result<(), AIError> {
    let len = text.trim().chars().count();
    if len < MIN_ANSWER_CHARS {
        return Err(AIError::invalid_response(format!(
            "answer has {len} characters, expected at least {MIN_ANSWER_CHARS}"
        )));
    }
    Ok(())
}

/// Generates answers to clinical questions.
pub struct AnswerGenerator {
    provider: Arc<dyn AIProvider>,
    settings: GenerationSettings,
}

impl AnswerGenerator {
    pub fn new(provider: Arc<dyn AIProvider>, settings: GenerationSettings) -> Self {
        Self { provider, settings }
    }

    pub fn confidence(&self) -> f64 {
        self.settings.confidence
    }

    pub fn provider_info(&self) -> ProviderInfo {
        self.provider.provider_info()
    }

    fn build_request(
        &self,
        question: &str,
        context: &str,
        metadata: RequestMetadata,
    ) -> CompletionRequest {
        CompletionRequest::new(metadata)
            .with_system_prompt(SYSTEM_PROMPT)
            .with_message(MessageRole::User, user_message(question, context))
            .with_max_tokens(self.settings.max_tokens)
            .with_temperature(self.settings.temperature)
    }

    /// Start generating an answer to `question` from `context`.
    ///
    /// Errors returned here happen before any token exists. Errors inside
    /// the stream happen after some tokens may have been yielded.
    pub async fn generate(
        &self,
        question: &str,
        context: &str,
        metadata: RequestMetadata,
    ) -> Result<AnswerStream, AIError> {
        let info = self.provider.provider_info();
        let request = self.build_request(question, context, metadata);

        tracing::debug!(
            provider = %info.name,
            model = %info.model,
            streaming = info.supports_streaming,
            context_chars = context.len(),
            "Generating answer"
        );

        if !info.supports_streaming {
            let response = self.provider.complete(request).await?;
            let text = response.content.trim().to_string();
            validate_answer(&text)?;

            let events = vec![
                Ok(AnswerEvent::Token(text)),
                Ok(AnswerEvent::Finished {
                    tokens_used: response.usage.completion_tokens,
                    model_used: info.model,
                }),
            ];
            return Ok(Box::pin(stream::iter(events)));
        }

        let chunks = self.provider.stream_complete(request).await?;
        let model = info.model;
        let events = chunks
            .map(move |item| {
                let mut events = Vec::with_capacity(2);
                match item {
                    Ok(chunk) => {
                        let finished = chunk.is_final().then(|| AnswerEvent::Finished {
                            tokens_used: chunk.usage.map(|u| u.completion_tokens).unwrap_or(0),
                            model_used: model.clone(),
                        });
                        if !chunk.delta.is_empty() {
                            events.push(Ok(AnswerEvent::Token(chunk.delta)));
                        }
                        events.extend(finished.map(Ok));
                    }
                    Err(e) => events.push(Err(e)),
                }
                events
            })
            .flat_map(stream::iter);

        Ok(Box::pin(events))
    }
}
