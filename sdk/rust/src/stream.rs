//! Streaming response capture
//!
//! [`TracedStream`] sits between a provider event stream and the caller. Every
//! event is forwarded unchanged and also fed to an accumulator; exactly one
//! trace is recorded when the stream ends, fails, or is dropped early.

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::Stream;
use pin_project_lite::pin_project;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;
use crate::normalize::{AnthropicUsage, ChatCompletion, ContentBlock, map_stop_reason};
use crate::trace::PendingTrace;
use crate::types::NormalizedResponse;

/// Provider event stream as seen by callers
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Value, ProviderError>> + Send>>;

const UNKNOWN_MODEL: &str = "unknown";

/// How far past the last known content block a new block index may land
const MAX_CONTENT_BLOCK_GAP: usize = 64;

/// Folds stream events into a final response
pub trait Accumulate: Send {
    fn ingest(&mut self, event: &Value);
    fn finish(&self) -> NormalizedResponse;
}

// ============================================================================
// Anthropic message stream
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MessageStreamEvent {
    MessageStart {
        message: StreamMessage,
    },
    ContentBlockStart {
        index: usize,
        content_block: ContentBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: ContentDelta,
    },
    MessageDelta {
        delta: MessageDeltaBody,
        #[serde(default)]
        usage: Option<AnthropicUsage>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StreamMessage {
    id: Option<String>,
    model: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentDelta {
    TextDelta {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MessageDeltaBody {
    stop_reason: Option<String>,
    stop_sequence: Option<String>,
}

/// Accumulates Anthropic `messages` stream events
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    id: Option<String>,
    model: Option<String>,
    content: Vec<ContentBlock>,
    text: String,
    stop_reason: Option<String>,
    stop_sequence: Option<String>,
    usage: Option<AnthropicUsage>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of each text content block, in index order
    pub fn text_blocks(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Other => None,
        })
    }

    pub fn stop_sequence(&self) -> Option<&str> {
        self.stop_sequence.as_deref()
    }

    pub fn cache_read_input_tokens(&self) -> Option<u64> {
        self.usage.as_ref().and_then(|u| u.cache_read_input_tokens)
    }

    pub fn cache_creation_input_tokens(&self) -> Option<u64> {
        self.usage.as_ref().and_then(|u| u.cache_creation_input_tokens)
    }

    pub fn server_tool_use(&self) -> Option<&Value> {
        self.usage.as_ref().and_then(|u| u.server_tool_use.as_ref())
    }

    fn apply(&mut self, event: MessageStreamEvent) {
        match event {
            MessageStreamEvent::MessageStart { message } => {
                self.id = message.id;
                self.model = message.model;
                self.usage = message.usage;
            }
            MessageStreamEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                if index < self.content.len() {
                    self.content[index] = content_block;
                } else if index - self.content.len() > MAX_CONTENT_BLOCK_GAP {
                    tracing::trace!(
                        index,
                        known = self.content.len(),
                        "Skipping content block with out-of-range index"
                    );
                } else {
                    self.content.resize(index, ContentBlock::Other);
                    self.content.push(content_block);
                }
            }
            MessageStreamEvent::ContentBlockDelta {
                index,
                delta: ContentDelta::TextDelta { text },
            } => {
                if let Some(ContentBlock::Text { text: block }) = self.content.get_mut(index) {
                    block.push_str(&text);
                }
                self.text.push_str(&text);
            }
            MessageStreamEvent::MessageDelta { delta, usage } => {
                self.stop_reason = delta.stop_reason;
                self.stop_sequence = delta.stop_sequence;
                // Delta usage is cumulative; input tokens usually only arrive in message_start
                if let Some(update) = usage {
                    let prior = self.usage.take().unwrap_or_default();
                    self.usage = Some(AnthropicUsage {
                        input_tokens: update.input_tokens.or(prior.input_tokens),
                        ..update
                    });
                }
            }
            MessageStreamEvent::ContentBlockDelta { .. } | MessageStreamEvent::Other => {}
        }
    }
}

impl Accumulate for StreamAccumulator {
    fn ingest(&mut self, event: &Value) {
        match MessageStreamEvent::deserialize(event) {
            Ok(event) => self.apply(event),
            Err(e) => tracing::trace!(error = %e, "Skipping unrecognized stream event"),
        }
    }

    fn finish(&self) -> NormalizedResponse {
        let usage = self.usage.as_ref();
        NormalizedResponse {
            content: (!self.text.is_empty()).then(|| self.text.clone()),
            input_tokens: usage.and_then(|u| u.input_tokens),
            output_tokens: usage.and_then(|u| u.output_tokens),
            finish_reason: self.stop_reason.as_deref().map(map_stop_reason),
            model: self
                .model
                .clone()
                .unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
            cost_cents: None,
            response_id: self.id.clone(),
        }
    }
}

// ============================================================================
// OpenAI-compatible chunk stream
// ============================================================================

/// Accumulates `chat.completion.chunk` events (OpenAI, OpenRouter)
///
/// Usage only arrives when the request sets `stream_options.include_usage`.
#[derive(Debug, Default)]
pub struct ChatChunkAccumulator {
    id: Option<String>,
    model: Option<String>,
    text: String,
    finish_reason: Option<String>,
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
    cost: Option<f64>,
}

impl ChatChunkAccumulator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Accumulate for ChatChunkAccumulator {
    fn ingest(&mut self, event: &Value) {
        let chunk = match ChatCompletion::deserialize(event) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::trace!(error = %e, "Skipping unrecognized chunk");
                return;
            }
        };

        if self.id.is_none() {
            self.id = chunk.id;
        }
        if !chunk.model.is_empty() {
            self.model = Some(chunk.model);
        }
        if let Some(choice) = chunk.choices.first() {
            if let Some(content) = choice.delta.as_ref().and_then(|d| d.content.as_deref()) {
                self.text.push_str(content);
            }
            if choice.finish_reason.is_some() {
                self.finish_reason = choice.finish_reason.clone();
            }
        }
        if let Some(usage) = chunk.usage {
            self.input_tokens = usage.prompt_tokens.or(self.input_tokens);
            self.output_tokens = usage.completion_tokens.or(self.output_tokens);
            self.cost = usage.cost.or(self.cost);
        }
        if chunk.cost.is_some() {
            self.cost = chunk.cost;
        }
    }

    fn finish(&self) -> NormalizedResponse {
        NormalizedResponse {
            content: (!self.text.is_empty()).then(|| self.text.clone()),
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            finish_reason: self.finish_reason.clone(),
            model: self
                .model
                .clone()
                .unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
            cost_cents: self.cost.map(|dollars| dollars * 100.0),
            response_id: self.id.clone(),
        }
    }
}

// ============================================================================
// Stream decorator
// ============================================================================

/// Accumulator plus the one-shot trace slot
///
/// Dropping it before the stream finished records what was seen so far.
struct StreamRecorder {
    accumulator: Box<dyn Accumulate>,
    pending: Option<PendingTrace>,
}

impl StreamRecorder {
    fn complete(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.succeed(&self.accumulator.finish());
        }
    }

    fn fail(&mut self, error: &ProviderError) {
        if let Some(pending) = self.pending.take() {
            pending.fail(error);
        }
    }
}

impl Drop for StreamRecorder {
    fn drop(&mut self) {
        self.complete();
    }
}

pin_project! {
    /// Forwards provider events while recording a single trace for the stream
    pub struct TracedStream<S> {
        #[pin]
        inner: S,
        recorder: StreamRecorder,
    }
}

impl<S> TracedStream<S> {
    pub(crate) fn new(inner: S, accumulator: Box<dyn Accumulate>, pending: PendingTrace) -> Self {
        Self {
            inner,
            recorder: StreamRecorder {
                accumulator,
                pending: Some(pending),
            },
        }
    }
}

impl<S> Stream for TracedStream<S>
where
    S: Stream<Item = Result<Value, ProviderError>>,
{
    type Item = Result<Value, ProviderError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.inner.poll_next(cx)) {
            Some(Ok(event)) => {
                if this.recorder.pending.is_some() {
                    this.recorder.accumulator.ingest(&event);
                }
                Poll::Ready(Some(Ok(event)))
            }
            Some(Err(error)) => {
                this.recorder.fail(&error);
                Poll::Ready(Some(Err(error)))
            }
            None => {
                this.recorder.complete();
                Poll::Ready(None)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
