//! Mock AI Provider for testing.
//!
//! Provides a configurable mock implementation of the AIProvider port,
//! allowing tests to run without calling real AI APIs.
//!
//! # Features
//!
//! - Scripted token sequences, replayed verbatim when streaming
//! - Per-token delays for busy and cancellation testing
//! - Error injection before or in the middle of a stream
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockAIProvider::new()
//!     .with_tokens(["The patient ", "takes ", "**Metformin**."])
//!     .with_token_delay(Duration::from_millis(20));
//!
//! let response = provider.complete(request).await?;
//! assert_eq!(response.content, "The patient takes **Metformin**.");
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    AIError, AIProvider, ChunkStream, CompletionRequest, CompletionResponse, FinishReason,
    ProviderInfo, StreamChunk, TokenUsage,
};

/// Mock AI provider for testing.
///
/// Configurable to return specific token sequences, simulate delays, or inject errors.
#[derive(Debug, Clone)]
pub struct MockAIProvider {
    /// Pre-configured responses (consumed in order).
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    /// Provider info to return.
    info: ProviderInfo,
    /// Simulated latency before the first token.
    delay: Duration,
    /// Simulated latency between tokens.
    token_delay: Duration,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Stream these tokens, then finish.
    Tokens { tokens: Vec<String>, usage: TokenUsage },
    /// Stream these tokens, then fail.
    FailAfter { tokens: Vec<String>, error: AIError },
    /// Fail before producing anything.
    Error(AIError),
}

impl Default for MockAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockAIProvider {
    /// Creates a new mock provider with default settings.
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            info: ProviderInfo::new("mock", "mock-model-1").with_streaming(true),
            delay: Duration::ZERO,
            token_delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Adds a response that splits `content` on whitespace boundaries.
    pub fn with_response(self, content: impl Into<String>) -> Self {
        let content = content.into();
        let tokens = content
            .split_inclusive(char::is_whitespace)
            .map(str::to_string)
            .collect::<Vec<_>>();
        self.with_tokens(tokens)
    }

    /// Adds a response made of exactly these tokens.
    pub fn with_tokens<I, S>(self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let completion_tokens = tokens.len() as u32;
        self.push(MockResponse::Tokens {
            tokens,
            usage: TokenUsage::new(100, completion_tokens),
        })
    }

    /// Adds a response that streams `tokens` and then fails with `error`.
    pub fn with_failure_after<I, S>(self, tokens: I, error: AIError) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens = tokens.into_iter().map(Into::into).collect();
        self.push(MockResponse::FailAfter { tokens, error })
    }

    /// Adds an error response to the queue.
    pub fn with_error(self, error: AIError) -> Self {
        self.push(MockResponse::Error(error))
    }

    /// Sets simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets simulated latency between streamed tokens.
    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = delay;
        self
    }

    /// Enables or disables token streaming in `provider_info`.
    pub fn with_streaming(mut self, supports: bool) -> Self {
        self.info = self.info.with_streaming(supports);
        self
    }

    /// Returns the number of calls made to this provider.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Returns all recorded calls.
    pub fn get_calls(&self) -> Vec<CompletionRequest> {
        lock(&self.calls).clone()
    }

    fn push(self, response: MockResponse) -> Self {
        lock(&self.responses).push_back(response);
        self
    }

    /// Gets the next response or a default.
    fn next_response(&self) -> MockResponse {
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| MockResponse::Tokens {
                tokens: vec!["Mock ".to_string(), "response".to_string()],
                usage: TokenUsage::new(5, 2),
            })
    }

    async fn record(&self, request: CompletionRequest) {
        lock(&self.calls).push(request);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl AIProvider for MockAIProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AIError> {
        self.record(request).await;

        match self.next_response() {
            MockResponse::Tokens { tokens, usage } => Ok(CompletionResponse {
                content: tokens.concat(),
                usage,
                model: self.info.model.clone(),
                finish_reason: FinishReason::Stop,
            }),
            MockResponse::FailAfter { error, .. } | MockResponse::Error(error) => Err(error),
        }
    }

    async fn stream_complete(&self, request: CompletionRequest) -> Result<ChunkStream, AIError> {
        self.record(request).await;

        let (tokens, last) = match self.next_response() {
            MockResponse::Tokens { tokens, usage } => (
                tokens,
                Ok(StreamChunk::final_chunk(FinishReason::Stop, usage)),
            ),
            MockResponse::FailAfter { tokens, error } => (tokens, Err(error)),
            MockResponse::Error(error) => return Err(error),
        };

        let token_delay = self.token_delay;
        let chunks = tokens
            .into_iter()
            .map(|t| Ok(StreamChunk::content(t)))
            .chain(std::iter::once(last));

        let stream = stream::iter(chunks).then(move |chunk| async move {
            if !token_delay.is_zero() {
                sleep(token_delay).await;
            }
            chunk
        });

        Ok(Box::pin(stream))
    }

    fn provider_info(&self) -> ProviderInfo {
        self.info.clone()
    }
}
