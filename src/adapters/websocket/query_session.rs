//! Per-channel query driver.
//!
//! Runs one query at a time through the `QueryState` machine:
//!
//! ```text
//! Idle ──► Retrieving ──► Streaming ──► Complete ──► Idle
//!   │           │              │
//!   └───────────┴──────────────┴──────► Error ─────► Idle
//! ```
//!
//! The receive loop calls [`QuerySession::submit`]. Busy checks, validation
//! and the `Idle → Retrieving` step happen synchronously there; retrieval and
//! generation then run on a spawned task under a child of the channel's
//! cancellation token. Every frame goes through the channel's emitter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::{validate_answer, AnswerEvent, AnswerGenerator};
use crate::config::SessionConfig;
use crate::domain::foundation::{SessionId, StateMachine, UserId};
use crate::domain::query::{AnswerResult, QueryErrorCode, QueryMetadata, QueryRequest, QueryState};
use crate::ports::{
    AIError, RequestMetadata, RetrievalError, RetrievalRequest, RetrievalService, RetrievedContext,
};

use super::emitter::{EmitError, FrameEmitter};
use super::messages::{CompleteMessage, QueryMessage, ServerMessage};

/// Collaborators and limits shared by every channel.
pub struct QueryServices {
    retrieval: Arc<dyn RetrievalService>,
    generator: Arc<AnswerGenerator>,
    retrieval_timeout: Duration,
    generation_timeout: Duration,
    max_question_length: usize,
}

impl QueryServices {
    pub fn new(
        retrieval: Arc<dyn RetrievalService>,
        generator: Arc<AnswerGenerator>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            retrieval,
            generator,
            retrieval_timeout: config.retrieval_timeout(),
            generation_timeout: config.generation_timeout(),
            max_question_length: config.max_question_length,
        }
    }

    pub fn with_retrieval_timeout(mut self, limit: Duration) -> Self {
        self.retrieval_timeout = limit;
        self
    }

    pub fn with_generation_timeout(mut self, limit: Duration) -> Self {
        self.generation_timeout = limit;
        self
    }
}

/// Why a query did not complete.
#[derive(Debug, thiserror::Error)]
pub enum QueryFailure {
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("retrieval timed out after {0:?}")]
    RetrievalTimeout(Duration),

    #[error("generation failed: {0}")]
    Provider(#[from] AIError),

    #[error("generation timed out after {0:?}")]
    GenerationTimeout(Duration),

    #[error("channel closed")]
    ChannelClosed(#[from] EmitError),

    #[error("query cancelled")]
    Cancelled,
}

impl QueryFailure {
    /// Code reported to the client, or `None` when nobody is left to tell.
    pub fn code(&self) -> Option<QueryErrorCode> {
        match self {
            QueryFailure::Retrieval(RetrievalError::NotFound { .. }) => {
                Some(QueryErrorCode::NotFound)
            }
            QueryFailure::Retrieval(RetrievalError::Unavailable(_))
            | QueryFailure::RetrievalTimeout(_) => Some(QueryErrorCode::RetrievalError),
            QueryFailure::Provider(_) | QueryFailure::GenerationTimeout(_) => {
                Some(QueryErrorCode::ProviderError)
            }
            QueryFailure::ChannelClosed(_) | QueryFailure::Cancelled => None,
        }
    }
}

/// Query driver for one channel.
///
/// Cheap to clone; clones share the same state, emitter and token.
#[derive(Clone)]
pub struct QuerySession {
    session_id: SessionId,
    user_id: UserId,
    emitter: FrameEmitter,
    state: Arc<watch::Sender<QueryState>>,
    services: Arc<QueryServices>,
    cancel: CancellationToken,
}

impl QuerySession {
    pub fn new(
        session_id: SessionId,
        user_id: UserId,
        emitter: FrameEmitter,
        state: watch::Sender<QueryState>,
        services: Arc<QueryServices>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            user_id,
            emitter,
            state: Arc::new(state),
            services,
            cancel,
        }
    }

    pub fn state(&self) -> QueryState {
        *self.state.borrow()
    }

    /// Apply `path` as one atomic move through the transition table.
    ///
    /// Observers never see the intermediate states. Illegal paths leave the
    /// state untouched.
    fn advance(&self, path: &[QueryState]) -> bool {
        self.state.send_if_modified(|current| {
            let next = path
                .iter()
                .try_fold(*current, |state, &target| state.transition_to(target));
            match next {
                Ok(next) => {
                    *current = next;
                    true
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        from = ?current,
                        "Rejected state transition: {}",
                        e
                    );
                    false
                }
            }
        })
    }

    /// Handle a `query` message from the client.
    ///
    /// Returns the spawned query task, or `None` when the query was refused
    /// (busy or invalid). Refusals are reported to the client here. An
    /// `Err` means the channel is gone.
    pub async fn submit(&self, message: QueryMessage) -> Result<Option<JoinHandle<()>>, EmitError> {
        if self.state().is_busy() {
            return self.reject_busy().await;
        }

        if let Some(tag) = &message.session_id {
            tracing::debug!(session_id = %self.session_id, client_tag = %tag, "Query tagged by client");
        }

        let query = match QueryRequest::new(
            message.document_type_id,
            &message.document_number,
            &message.question,
            self.services.max_question_length,
        ) {
            Ok(query) => query,
            Err(e) => {
                tracing::info!(session_id = %self.session_id, "Query failed validation: {}", e);
                self.advance(&[QueryState::Error, QueryState::Idle]);
                self.emitter
                    .emit(ServerMessage::error_with_message(
                        self.session_id,
                        QueryErrorCode::ValidationError,
                        e.to_string(),
                    ))
                    .await?;
                return Ok(None);
            }
        };

        if !self.advance(&[QueryState::Retrieving]) {
            return self.reject_busy().await;
        }

        let session = self.clone();
        let cancel = self.cancel.child_token();
        Ok(Some(tokio::spawn(async move {
            session.run(query, cancel).await
        })))
    }

    async fn reject_busy(&self) -> Result<Option<JoinHandle<()>>, EmitError> {
        tracing::info!(session_id = %self.session_id, state = ?self.state(), "Query refused, session busy");
        self.emitter
            .emit(ServerMessage::error(self.session_id, QueryErrorCode::SessionBusy))
            .await?;
        Ok(None)
    }

    async fn run(self, query: QueryRequest, cancel: CancellationToken) {
        let started = Instant::now();
        tracing::info!(
            session_id = %self.session_id,
            user_id = %self.user_id,
            document_type_id = query.document_type_id(),
            question_chars = query.question().chars().count(),
            "Query started"
        );

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(QueryFailure::Cancelled),
            result = self.execute(&query, started) => result,
        };

        match outcome {
            Ok(()) => {
                self.advance(&[QueryState::Complete, QueryState::Idle]);
                tracing::info!(
                    session_id = %self.session_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Query complete"
                );
            }
            Err(failure) => {
                match failure.code() {
                    Some(code) => {
                        tracing::warn!(session_id = %self.session_id, %code, "Query failed: {}", failure);
                        let frame = ServerMessage::error(self.session_id, code);
                        if self.emitter.emit(frame).await.is_err() {
                            self.cancel.cancel();
                        }
                    }
                    None => {
                        tracing::debug!(session_id = %self.session_id, "Query stopped: {}", failure);
                        if matches!(failure, QueryFailure::ChannelClosed(_)) {
                            self.cancel.cancel();
                        }
                    }
                }
                self.advance(&[QueryState::Error, QueryState::Idle]);
            }
        }
    }

    async fn execute(&self, query: &QueryRequest, started: Instant) -> Result<(), QueryFailure> {
        self.emitter
            .emit(ServerMessage::status("retrieving context"))
            .await?;
        let retrieved = self.retrieve(query).await?;

        self.advance(&[QueryState::Streaming]);
        self.emitter.emit(ServerMessage::StreamStart).await?;

        let limit = self.services.generation_timeout;
        let answer = timeout(limit, self.generate(query, &retrieved))
            .await
            .map_err(|_| QueryFailure::GenerationTimeout(limit))??;

        self.emitter.emit(ServerMessage::StreamEnd).await?;

        let metadata = QueryMetadata {
            total_records_analyzed: retrieved.records_analyzed,
            vector_chunks_used: retrieved.chunks_used,
            tokens_used: answer.tokens_used,
            processing_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };
        self.emitter
            .emit(ServerMessage::Complete(CompleteMessage {
                patient_info: retrieved.patient,
                metadata,
                answer,
            }))
            .await?;
        Ok(())
    }

    async fn retrieve(&self, query: &QueryRequest) -> Result<RetrievedContext, QueryFailure> {
        let request = RetrievalRequest::from(query);
        let limit = self.services.retrieval_timeout;

        let retrieved = timeout(limit, self.services.retrieval.retrieve(&request))
            .await
            .map_err(|_| QueryFailure::RetrievalTimeout(limit))??;

        tracing::debug!(
            session_id = %self.session_id,
            records = retrieved.records_analyzed,
            chunks = retrieved.chunks_used,
            context_chars = retrieved.context.len(),
            "Context assembled"
        );
        Ok(retrieved)
    }

    /// Stream the answer as `token` frames and return the assembled result.
    ///
    /// The returned text is built from exactly the emitted token payloads.
    async fn generate(
        &self,
        query: &QueryRequest,
        retrieved: &RetrievedContext,
    ) -> Result<AnswerResult, QueryFailure> {
        let generator = &self.services.generator;
        let metadata = RequestMetadata::new(self.user_id, self.session_id, Uuid::new_v4().to_string());
        let mut events = generator
            .generate(query.question(), &retrieved.context, metadata)
            .await?;

        let mut text = String::new();
        while let Some(event) = events.next().await {
            match event? {
                AnswerEvent::Token(token) => {
                    text.push_str(&token);
                    self.emitter.emit(ServerMessage::token(token)).await?;
                }
                AnswerEvent::Finished {
                    tokens_used,
                    model_used,
                } => {
                    validate_answer(&text)?;
                    return Ok(AnswerResult {
                        text,
                        confidence: generator.confidence(),
                        model_used,
                        tokens_used,
                    });
                }
            }
        }

        Err(AIError::invalid_response("answer stream ended before finishing").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockAIProvider;
    use crate::adapters::retrieval::InMemoryRetrievalService;
    use crate::adapters::websocket::keepalive::answer_ping;
    use crate::application::GenerationSettings;
    use proptest::prelude::*;
    use tokio::sync::mpsc;

    struct Harness {
        session: QuerySession,
        frames: mpsc::Receiver<ServerMessage>,
        cancel: CancellationToken,
    }

    fn harness(retrieval: InMemoryRetrievalService, provider: MockAIProvider) -> Harness {
        harness_with(retrieval, provider, |services| services)
    }

    fn harness_with(
        retrieval: InMemoryRetrievalService,
        provider: MockAIProvider,
        tune: impl FnOnce(QueryServices) -> QueryServices,
    ) -> Harness {
        let cancel = CancellationToken::new();
        let (emitter, frames) = FrameEmitter::new(256, cancel.clone());
        let (state, _) = watch::channel(QueryState::Idle);
        let generator = Arc::new(AnswerGenerator::new(
            Arc::new(provider),
            GenerationSettings::default(),
        ));
        let services = tune(QueryServices::new(
            Arc::new(retrieval),
            generator,
            &SessionConfig::default(),
        ));
        let session = QuerySession::new(
            SessionId::new(),
            UserId::new(7).unwrap(),
            emitter,
            state,
            Arc::new(services),
            cancel.clone(),
        );
        Harness {
            session,
            frames,
            cancel,
        }
    }

    fn patients() -> InMemoryRetrievalService {
        InMemoryRetrievalService::new().with_patient(8, "30995750", "Ana Gómez")
    }

    fn query(document_type_id: i64, document_number: &str, question: &str) -> QueryMessage {
        QueryMessage {
            session_id: None,
            document_type_id,
            document_number: document_number.to_string(),
            question: question.to_string(),
        }
    }

    fn known_query() -> QueryMessage {
        query(8, "30995750", "¿qué médico atendió la consulta?")
    }

    async fn next_frame(frames: &mut mpsc::Receiver<ServerMessage>) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(5), frames.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("emitter dropped")
    }

    /// Frames up to and including the first `complete` or `error`.
    async fn until_terminal(frames: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        loop {
            let frame = next_frame(frames).await;
            let done = matches!(frame, ServerMessage::Complete(_) | ServerMessage::Error(_));
            out.push(frame);
            if done {
                return out;
            }
        }
    }

    fn kinds(frames: &[ServerMessage]) -> Vec<&'static str> {
        frames.iter().map(ServerMessage::kind).collect()
    }

    fn streamed_text(frames: &[ServerMessage]) -> String {
        frames
            .iter()
            .filter_map(|f| match f {
                ServerMessage::Token(t) => Some(t.token.as_str()),
                _ => None,
            })
            .collect()
    }

    fn error_code(frame: &ServerMessage) -> QueryErrorCode {
        match frame {
            ServerMessage::Error(e) => e.error.code,
            other => panic!("expected error frame, got {:?}", other),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success
    // ════════════════════════════════════════════════════════════════════════════

    mod success {
        use super::*;

        #[tokio::test]
        async fn frames_follow_protocol_order() {
            let provider =
                MockAIProvider::new().with_tokens(["The patient ", "was seen by ", "**Dr. Rivera**."]);
            let mut h = harness(patients(), provider);

            let task = h.session.submit(known_query()).await.unwrap().unwrap();
            let frames = until_terminal(&mut h.frames).await;
            task.await.unwrap();

            assert_eq!(
                kinds(&frames),
                [
                    "status",
                    "stream_start",
                    "token",
                    "token",
                    "token",
                    "stream_end",
                    "complete"
                ]
            );
            assert_eq!(
                frames[0],
                ServerMessage::status("retrieving context")
            );
        }

        #[tokio::test]
        async fn complete_carries_answer_and_metadata() {
            let provider =
                MockAIProvider::new().with_tokens(["The patient ", "was seen by ", "**Dr. Rivera**."]);
            let mut h = harness(patients(), provider);

            let task = h.session.submit(known_query()).await.unwrap().unwrap();
            let frames = until_terminal(&mut h.frames).await;
            task.await.unwrap();

            let ServerMessage::Complete(complete) = frames.last().unwrap() else {
                panic!("expected complete");
            };
            assert_eq!(complete.answer.text, "The patient was seen by **Dr. Rivera**.");
            assert_eq!(complete.answer.text, streamed_text(&frames));
            assert_eq!(complete.answer.confidence, 0.85);
            assert_eq!(complete.answer.model_used, "mock-model-1");
            assert_eq!(complete.answer.tokens_used, 3);
            assert_eq!(complete.metadata.total_records_analyzed, 2);
            assert_eq!(complete.metadata.vector_chunks_used, 2);
            assert_eq!(complete.metadata.tokens_used, 3);
            assert_eq!(complete.patient_info.full_name, "Ana Gómez");
            assert_eq!(complete.patient_info.document_type, "CD");
        }

        #[tokio::test]
        async fn state_returns_to_idle_and_accepts_next_query() {
            let provider = MockAIProvider::new()
                .with_response("First answer about the patient.")
                .with_response("Second answer about the patient.");
            let mut h = harness(patients(), provider);

            let first = h.session.submit(known_query()).await.unwrap().unwrap();
            until_terminal(&mut h.frames).await;
            first.await.unwrap();
            assert_eq!(h.session.state(), QueryState::Idle);

            let second = h.session.submit(known_query()).await.unwrap().unwrap();
            let frames = until_terminal(&mut h.frames).await;
            second.await.unwrap();

            assert_eq!(streamed_text(&frames), "Second answer about the patient.");
            assert_eq!(h.session.state(), QueryState::Idle);
        }

        #[tokio::test]
        async fn non_streaming_provider_sends_single_token() {
            let provider = MockAIProvider::new()
                .with_streaming(false)
                .with_tokens(["  The patient ", "is stable.  "]);
            let mut h = harness(patients(), provider);

            let task = h.session.submit(known_query()).await.unwrap().unwrap();
            let frames = until_terminal(&mut h.frames).await;
            task.await.unwrap();

            assert_eq!(
                kinds(&frames),
                ["status", "stream_start", "token", "stream_end", "complete"]
            );
            let ServerMessage::Complete(complete) = frames.last().unwrap() else {
                panic!("expected complete");
            };
            assert_eq!(complete.answer.text, "The patient is stable.");
            assert_eq!(streamed_text(&frames), complete.answer.text);
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn token_concatenation_equals_answer_text(
                tokens in prop::collection::vec("[a-zA-Z0-9 .,*\n]{1,12}", 0..24)
            ) {
                let mut tokens = tokens;
                tokens.insert(0, "Answer follows: ".to_string());

                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .unwrap();
                let frames = runtime.block_on(async {
                    let mut h = harness(patients(), MockAIProvider::new().with_tokens(tokens.clone()));
                    let task = h.session.submit(known_query()).await.unwrap().unwrap();
                    let frames = until_terminal(&mut h.frames).await;
                    task.await.unwrap();
                    frames
                });

                let Some(ServerMessage::Complete(complete)) = frames.last() else {
                    panic!("expected complete, got {:?}", frames.last());
                };
                prop_assert_eq!(&streamed_text(&frames), &complete.answer.text);
                prop_assert_eq!(complete.answer.text.clone(), tokens.concat());
            }
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Refusals
    // ════════════════════════════════════════════════════════════════════════════

    mod refusals {
        use super::*;

        #[tokio::test]
        async fn invalid_query_yields_validation_error() {
            let retrieval = patients();
            let mut h = harness(retrieval.clone(), MockAIProvider::new());

            let task = h.session.submit(query(8, "30995750", "   ")).await.unwrap();

            assert!(task.is_none());
            let frame = next_frame(&mut h.frames).await;
            assert_eq!(error_code(&frame), QueryErrorCode::ValidationError);
            assert_eq!(retrieval.call_count(), 0);
            assert_eq!(h.session.state(), QueryState::Idle);
        }

        #[tokio::test]
        async fn missing_fields_are_validation_errors() {
            let mut h = harness(patients(), MockAIProvider::new());
            let message: QueryMessage = serde_json::from_str(r#"{"question":"who?"}"#).unwrap();

            assert!(h.session.submit(message).await.unwrap().is_none());
            let frame = next_frame(&mut h.frames).await;
            assert_eq!(error_code(&frame), QueryErrorCode::ValidationError);
        }

        #[tokio::test]
        async fn query_while_busy_is_refused_and_first_completes() {
            let provider = MockAIProvider::new()
                .with_tokens(["The ", "patient ", "is ", "stable ", "today."])
                .with_token_delay(Duration::from_millis(20));
            let mut h = harness(patients(), provider.clone());

            let task = h.session.submit(known_query()).await.unwrap().unwrap();
            assert!(h.session.state().is_busy());
            assert!(h.session.submit(known_query()).await.unwrap().is_none());

            let mut frames = Vec::new();
            loop {
                let frame = next_frame(&mut h.frames).await;
                let done = matches!(frame, ServerMessage::Complete(_));
                frames.push(frame);
                if done {
                    break;
                }
            }
            task.await.unwrap();

            let (busy, rest): (Vec<_>, Vec<_>) = frames
                .into_iter()
                .partition(|f| matches!(f, ServerMessage::Error(_)));
            assert_eq!(busy.len(), 1);
            let ServerMessage::Error(error) = &busy[0] else {
                unreachable!()
            };
            assert_eq!(error.error.code, QueryErrorCode::SessionBusy);
            assert_eq!(error.session_id, h.session.session_id);
            assert_eq!(
                kinds(&rest),
                [
                    "status",
                    "stream_start",
                    "token",
                    "token",
                    "token",
                    "token",
                    "token",
                    "stream_end",
                    "complete"
                ]
            );
            assert_eq!(provider.call_count(), 1);
        }

        #[tokio::test]
        async fn ping_during_streaming_does_not_disturb_sequence() {
            let provider = MockAIProvider::new()
                .with_tokens(["The ", "patient ", "is ", "stable ", "today."])
                .with_token_delay(Duration::from_millis(20));
            let mut h = harness(patients(), provider);

            let task = h.session.submit(known_query()).await.unwrap().unwrap();
            loop {
                if matches!(next_frame(&mut h.frames).await, ServerMessage::StreamStart) {
                    break;
                }
            }
            answer_ping(&h.session.emitter, h.session.session_id)
                .await
                .unwrap();

            let frames = until_terminal(&mut h.frames).await;
            task.await.unwrap();

            assert_eq!(kinds(&frames).iter().filter(|k| **k == "pong").count(), 1);
            let without_pong: Vec<_> = kinds(&frames).into_iter().filter(|k| *k != "pong").collect();
            assert_eq!(
                without_pong,
                ["token", "token", "token", "token", "token", "stream_end", "complete"]
            );
            let ServerMessage::Complete(complete) = frames.last().unwrap() else {
                panic!("expected complete");
            };
            assert_eq!(complete.answer.text, streamed_text(&frames));
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failures
    // ════════════════════════════════════════════════════════════════════════════

    mod failures {
        use super::*;

        #[tokio::test]
        async fn unknown_patient_is_not_found_without_stream_start() {
            let provider = MockAIProvider::new();
            let mut h = harness(InMemoryRetrievalService::new(), provider.clone());

            let task = h.session.submit(query(8, "00000000", "who?")).await.unwrap().unwrap();
            let frames = until_terminal(&mut h.frames).await;
            task.await.unwrap();

            assert_eq!(kinds(&frames), ["status", "error"]);
            assert_eq!(error_code(&frames[1]), QueryErrorCode::NotFound);
            assert_eq!(provider.call_count(), 0);
            assert_eq!(h.session.state(), QueryState::Idle);
        }

        #[tokio::test]
        async fn unavailable_retrieval_is_retrieval_error() {
            let retrieval = patients().with_failure(RetrievalError::unavailable("connection refused"));
            let mut h = harness(retrieval, MockAIProvider::new());

            let task = h.session.submit(known_query()).await.unwrap().unwrap();
            let frames = until_terminal(&mut h.frames).await;
            task.await.unwrap();

            assert_eq!(kinds(&frames), ["status", "error"]);
            assert_eq!(error_code(&frames[1]), QueryErrorCode::RetrievalError);
        }

        #[tokio::test]
        async fn slow_retrieval_times_out() {
            let retrieval = patients().with_delay(Duration::from_millis(500));
            let mut h = harness_with(retrieval, MockAIProvider::new(), |s| {
                s.with_retrieval_timeout(Duration::from_millis(20))
            });

            let task = h.session.submit(known_query()).await.unwrap().unwrap();
            let frames = until_terminal(&mut h.frames).await;
            task.await.unwrap();

            assert_eq!(kinds(&frames), ["status", "error"]);
            assert_eq!(error_code(&frames[1]), QueryErrorCode::RetrievalError);
            assert_eq!(h.session.state(), QueryState::Idle);
        }

        #[tokio::test]
        async fn provider_failure_mid_stream_keeps_sent_tokens() {
            let provider = MockAIProvider::new()
                .with_failure_after(["The patient "], AIError::network("connection reset"));
            let mut h = harness(patients(), provider);

            let task = h.session.submit(known_query()).await.unwrap().unwrap();
            let frames = until_terminal(&mut h.frames).await;
            task.await.unwrap();

            assert_eq!(kinds(&frames), ["status", "stream_start", "token", "error"]);
            assert_eq!(error_code(&frames[3]), QueryErrorCode::ProviderError);
            assert_eq!(h.session.state(), QueryState::Idle);
        }

        #[tokio::test]
        async fn provider_error_before_tokens() {
            let provider = MockAIProvider::new().with_error(AIError::rate_limited(30));
            let mut h = harness(patients(), provider);

            let task = h.session.submit(known_query()).await.unwrap().unwrap();
            let frames = until_terminal(&mut h.frames).await;
            task.await.unwrap();

            assert_eq!(kinds(&frames), ["status", "stream_start", "error"]);
            assert_eq!(error_code(&frames[2]), QueryErrorCode::ProviderError);
        }

        #[tokio::test]
        async fn short_answer_is_provider_error() {
            let mut h = harness(patients(), MockAIProvider::new().with_tokens(["ok"]));

            let task = h.session.submit(known_query()).await.unwrap().unwrap();
            let frames = until_terminal(&mut h.frames).await;
            task.await.unwrap();

            assert_eq!(kinds(&frames), ["status", "stream_start", "token", "error"]);
            assert_eq!(error_code(&frames[3]), QueryErrorCode::ProviderError);
        }

        #[tokio::test]
        async fn slow_generation_times_out() {
            let provider = MockAIProvider::new()
                .with_response("This answer arrives far too slowly.")
                .with_token_delay(Duration::from_millis(200));
            let mut h = harness_with(patients(), provider, |s| {
                s.with_generation_timeout(Duration::from_millis(50))
            });

            let task = h.session.submit(known_query()).await.unwrap().unwrap();
            let frames = until_terminal(&mut h.frames).await;
            task.await.unwrap();

            assert_eq!(kinds(&frames), ["status", "stream_start", "error"]);
            assert_eq!(error_code(&frames[2]), QueryErrorCode::ProviderError);
        }

        #[test]
        fn failure_codes() {
            let not_found = QueryFailure::Retrieval(RetrievalError::NotFound {
                document_type_id: 8,
                document_number: "1".to_string(),
            });
            assert_eq!(not_found.code(), Some(QueryErrorCode::NotFound));
            assert_eq!(
                QueryFailure::RetrievalTimeout(Duration::from_secs(30)).code(),
                Some(QueryErrorCode::RetrievalError)
            );
            assert_eq!(
                QueryFailure::GenerationTimeout(Duration::from_secs(60)).code(),
                Some(QueryErrorCode::ProviderError)
            );
            assert_eq!(QueryFailure::from(EmitError::ChannelClosed).code(), None);
            assert_eq!(QueryFailure::Cancelled.code(), None);
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Channel loss
    // ════════════════════════════════════════════════════════════════════════════

    mod channel_loss {
        use super::*;

        #[tokio::test]
        async fn cancellation_stops_frames() {
            let tokens: Vec<String> = (0..20).map(|i| format!("token{i} ")).collect();
            let provider = MockAIProvider::new()
                .with_tokens(tokens)
                .with_token_delay(Duration::from_millis(20));
            let mut h = harness(patients(), provider);

            let task = h.session.submit(known_query()).await.unwrap().unwrap();
            loop {
                if matches!(next_frame(&mut h.frames).await, ServerMessage::Token(_)) {
                    break;
                }
            }
            h.cancel.cancel();
            task.await.unwrap();

            assert_eq!(h.session.state(), QueryState::Idle);
            while let Ok(frame) = h.frames.try_recv() {
                assert!(
                    matches!(frame, ServerMessage::Token(_)),
                    "unexpected frame after cancel: {:?}",
                    frame
                );
            }
        }

        #[tokio::test]
        async fn cancellation_during_retrieval_drops_the_query() {
            let retrieval = patients().with_delay(Duration::from_secs(2));
            let provider = MockAIProvider::new();
            let mut h = harness(retrieval.clone(), provider.clone());

            let task = h.session.submit(known_query()).await.unwrap().unwrap();
            assert_eq!(
                next_frame(&mut h.frames).await,
                ServerMessage::status("retrieving context")
            );
            assert_eq!(h.session.state(), QueryState::Retrieving);

            h.cancel.cancel();
            tokio::time::timeout(Duration::from_millis(500), task)
                .await
                .expect("query did not stop promptly")
                .unwrap();

            assert_eq!(h.session.state(), QueryState::Idle);
            assert!(h.frames.try_recv().is_err(), "no frame may follow the cancel");
            assert_eq!(retrieval.call_count(), 1);
            assert_eq!(provider.call_count(), 0);
        }

        #[tokio::test]
        async fn write_failure_closes_channel() {
            let h = harness(patients(), MockAIProvider::new());
            let Harness {
                session,
                frames,
                cancel,
            } = h;
            drop(frames);

            let task = session.submit(known_query()).await.unwrap().unwrap();
            task.await.unwrap();

            assert!(cancel.is_cancelled());
            assert_eq!(session.state(), QueryState::Idle);
        }
    }
}
