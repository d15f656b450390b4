
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiClient, ByteStream, StreamParser};
use crate::config::Config;
use crate::extract::ToolCallExtractor;
use crate::policy::{RateLimiter, ResponseCache};
use crate::state::Transcript;
use crate::types::{ChatRequest, FinalizeReason, Message, StreamEvent, ToolResult};

/// Knobs a session takes from config. Kept separate so tests can build a
/// session without touching the environment.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub max_history_messages: usize,
    pub idle_timeout: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_history_messages: 32,
            idle_timeout: None,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_history_messages: config.max_history_messages,
            idle_timeout: config.idle_timeout,
        }
    }
}

/// How one `send` call can fail. Every variant except `RateLimited` leaves
/// the transcript finalized, never mid-stream.
#[derive(Debug, Error)]
pub enum SendError {
    /// The request never produced a stream: connect failure, timeout, or a
    /// non-2xx status.
    #[error("network request failed: {0}")]
    Network(anyhow::Error),
    /// The stream opened but broke, stalled, or carried an error event.
    #[error("stream failed: {0}")]
    Stream(String),
    /// The caller cancelled the turn.
    #[error("turn aborted")]
    Aborted,
    /// Refused before any message was appended.
    #[error("rate limited, retry in {retry_after:?}")]
    RateLimited { retry_after: Duration },
}

/// Incremental transcript notifications for a UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptUpdate {
    UserMessage(String),
    TurnStarted,
    ContentDelta(String),
    ToolResult(ToolResult),
    Finalized(FinalizeReason),
    Reset,
}

/// Drives one conversation against the chat endpoint: owns the transcript,
/// decodes the stream, routes tool calls, and enforces the injected
/// rate-limit and cache policies.
pub struct ChatSession {
    client: ApiClient,
    transcript: Transcript,
    options: SessionOptions,
    rate_limiter: Option<RateLimiter>,
    cache: Option<ResponseCache>,
    update_tx: Option<mpsc::UnboundedSender<TranscriptUpdate>>,
}

impl ChatSession {
    pub fn new(client: ApiClient, options: SessionOptions) -> Self {
        Self {
            client,
            transcript: Transcript::new(),
            options,
            rate_limiter: None,
            cache: None,
            update_tx: None,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_update_channel(
        mut self,
        update_tx: mpsc::UnboundedSender<TranscriptUpdate>,
    ) -> Self {
        self.update_tx = Some(update_tx);
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn reset(&mut self) {
        self.transcript.reset();
        self.emit(TranscriptUpdate::Reset);
    }

    /// Sends one user message and runs the turn to completion. Cancellation
    /// is only reachable through `send_with_cancel`.
    pub async fn send(&mut self, text: &str) -> Result<(), SendError> {
        self.send_with_cancel(text, CancellationToken::new()).await
    }

    pub async fn send_with_cancel(
        &mut self,
        text: &str,
        cancel: CancellationToken,
    ) -> Result<(), SendError> {
        if let Some(limiter) = &mut self.rate_limiter {
            if let Err(retry_after) = limiter.check() {
                return Err(SendError::RateLimited { retry_after });
            }
        }

        self.transcript.push_user_message(text);
        self.emit(TranscriptUpdate::UserMessage(text.to_string()));

        let request = self.build_request();
        let cache_key = serde_json::to_string(&request).ok();

        if let (Some(cache), Some(key)) = (&mut self.cache, cache_key.as_deref()) {
            if let Some(turn) = cache.get(key) {
                self.replay_cached_turn(&turn);
                return Ok(());
            }
        }

        let turn_start = self.transcript.len();
        self.transcript.begin_assistant_turn();
        self.emit(TranscriptUpdate::TurnStarted);

        let mut stream = match self.client.create_stream(&request).await {
            Ok(stream) => stream,
            Err(error) => {
                self.finalize_turn(FinalizeReason::Error);
                return Err(SendError::Network(error));
            }
        };

        let mut parser = StreamParser::new();
        let mut extractor = ToolCallExtractor::new();

        loop {
            let chunk_result = tokio::select! {
                _ = cancel.cancelled() => {
                    return self.abort_turn(&mut extractor);
                }
                chunk = next_chunk(&mut stream, self.options.idle_timeout) => chunk,
            };

            let chunk = match chunk_result {
                Err(StreamWaitError::Stalled(limit)) => {
                    return self.fail_turn(
                        &mut extractor,
                        format!("no data received for {}s", limit.as_secs()),
                    );
                }
                Ok(None) => {
                    // Stream ended without a done event. Treat it as done;
                    // the backend closes the body right after the last frame.
                    for event in parser.finish() {
                        if cancel.is_cancelled() {
                            return self.abort_turn(&mut extractor);
                        }
                        if let Some(outcome) = self.apply_event(event, &mut extractor) {
                            return self.close_turn(outcome, &mut extractor, turn_start, &cache_key);
                        }
                    }
                    return self.close_turn(TurnOutcome::Done, &mut extractor, turn_start, &cache_key);
                }
                Ok(Some(Err(error))) => {
                    return self.fail_turn(&mut extractor, error.to_string());
                }
                Ok(Some(Ok(chunk))) => chunk,
            };

            let events = match parser.process(&chunk) {
                Ok(events) => events,
                Err(error) => {
                    return self.fail_turn(&mut extractor, error.to_string());
                }
            };

            for event in events {
                if cancel.is_cancelled() {
                    return self.abort_turn(&mut extractor);
                }
                if let Some(outcome) = self.apply_event(event, &mut extractor) {
                    return self.close_turn(outcome, &mut extractor, turn_start, &cache_key);
                }
            }
        }
    }

    /// Routes one decoded event into the transcript. Returns the turn outcome
    /// when the event ends the turn.
    fn apply_event(
        &mut self,
        event: StreamEvent,
        extractor: &mut ToolCallExtractor,
    ) -> Option<TurnOutcome> {
        match event {
            StreamEvent::Content { content } => {
                let extraction = extractor.push_text(&content);
                if !extraction.visible.is_empty() {
                    self.transcript.apply_content(&extraction.visible);
                    self.emit(TranscriptUpdate::ContentDelta(extraction.visible));
                }
                for call in extraction.calls {
                    self.transcript.apply_tool_result(call.clone());
                    self.emit(TranscriptUpdate::ToolResult(call));
                }
                None
            }
            StreamEvent::Error { error } => Some(TurnOutcome::ErrorEvent(error)),
            StreamEvent::Done => Some(TurnOutcome::Done),
            StreamEvent::Unknown => None,
            tool_event => {
                if let Some(result) = tool_event.into_tool_result() {
                    self.transcript.apply_tool_result(result.clone());
                    self.emit(TranscriptUpdate::ToolResult(result));
                }
                None
            }
        }
    }

    fn close_turn(
        &mut self,
        outcome: TurnOutcome,
        extractor: &mut ToolCallExtractor,
        turn_start: usize,
        cache_key: &Option<String>,
    ) -> Result<(), SendError> {
        self.drain_extractor(extractor);
        match outcome {
            TurnOutcome::Done => {
                self.finalize_turn(FinalizeReason::Done);
                if let (Some(cache), Some(key)) = (&mut self.cache, cache_key) {
                    cache.insert(key.clone(), self.transcript.turn_slice(turn_start));
                }
                Ok(())
            }
            TurnOutcome::ErrorEvent(error) => {
                self.finalize_turn(FinalizeReason::Error);
                Err(SendError::Stream(error))
            }
        }
    }

    fn fail_turn(
        &mut self,
        extractor: &mut ToolCallExtractor,
        error: String,
    ) -> Result<(), SendError> {
        self.drain_extractor(extractor);
        self.finalize_turn(FinalizeReason::Error);
        Err(SendError::Stream(error))
    }

    fn abort_turn(&mut self, extractor: &mut ToolCallExtractor) -> Result<(), SendError> {
        self.drain_extractor(extractor);
        self.finalize_turn(FinalizeReason::Cancelled);
        Err(SendError::Aborted)
    }

    /// A withheld call fragment at end of turn comes back as plain text.
    fn drain_extractor(&mut self, extractor: &mut ToolCallExtractor) {
        let tail = extractor.flush();
        if !tail.is_empty() {
            self.transcript.apply_content(&tail);
            self.emit(TranscriptUpdate::ContentDelta(tail));
        }
    }

    fn finalize_turn(&mut self, reason: FinalizeReason) {
        self.transcript.finalize(reason);
        self.emit(TranscriptUpdate::Finalized(reason));
    }

    fn replay_cached_turn(&mut self, turn: &[Message]) {
        self.emit(TranscriptUpdate::TurnStarted);
        for message in turn {
            if !message.content.is_empty() {
                self.emit(TranscriptUpdate::ContentDelta(message.content.clone()));
            }
            if let Some(result) = &message.tool_result {
                self.emit(TranscriptUpdate::ToolResult(result.clone()));
            }
        }
        self.transcript.append_finalized(turn);
        self.emit(TranscriptUpdate::Finalized(FinalizeReason::Done));
    }

    fn build_request(&self) -> ChatRequest {
        let history = self.transcript.messages();
        let start = history.len().saturating_sub(self.options.max_history_messages);
        ChatRequest::from_history(&history[start..])
    }

    fn emit(&self, update: TranscriptUpdate) {
        if let Some(tx) = &self.update_tx {
            let _ = tx.send(update);
        }
    }
}

enum TurnOutcome {
    Done,
    ErrorEvent(String),
}

enum StreamWaitError {
    Stalled(Duration),
}

async fn next_chunk(
    stream: &mut ByteStream,
    idle_timeout: Option<Duration>,
) -> Result<Option<anyhow::Result<Bytes>>, StreamWaitError> {
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, stream.next())
            .await
            .map_err(|_| StreamWaitError::Stalled(limit)),
        None => Ok(stream.next().await),
    }
}
