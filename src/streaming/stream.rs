//! Stream assembly: framed events in, ordered canonical parts out.

use super::aggregator::FinishAggregator;
use super::interpreter::ChunkInterpreter;
use crate::errors::GenAiResult;
use crate::observability::MetricsCollector;
use crate::transport::{ByteStream, SseStream};
use crate::types::{FinishReason, StreamPart, ToolCall, UsageSnapshot};
use futures::stream::{Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartStreamState {
    Streaming,
    Done,
}

/// Ordered, single-pass stream of [`StreamPart`]s for one response.
///
/// Parts come out in the order their chunks were framed. When the body ends
/// normally, exactly one `Finish` part follows everything else. A read failure
/// is yielded as an error and ends the stream without a `Finish` part.
pub struct PartStream {
    events: SseStream,
    interpreter: ChunkInterpreter,
    aggregator: FinishAggregator,
    pending: VecDeque<StreamPart>,
    state: PartStreamState,
    metrics: Option<Arc<dyn MetricsCollector>>,
}

impl PartStream {
    /// Create a part stream over framed events
    pub fn new(events: SseStream) -> Self {
        Self {
            events,
            interpreter: ChunkInterpreter::new(),
            aggregator: FinishAggregator::new(),
            pending: VecDeque::new(),
            state: PartStreamState::Streaming,
            metrics: None,
        }
    }

    /// Create a part stream over a raw byte stream
    pub fn from_bytes(bytes: ByteStream) -> Self {
        Self::new(SseStream::new(bytes))
    }

    /// Create a part stream over a response body that may be missing.
    pub fn from_body(body: Option<ByteStream>) -> GenAiResult<Self> {
        SseStream::from_body(body).map(Self::new)
    }

    /// Emit each parsed chunk as a raw part ahead of its derived parts
    pub fn with_raw_chunks(mut self, include_raw: bool) -> Self {
        self.interpreter = self.interpreter.with_raw_chunks(include_raw);
        self
    }

    /// Report dropped chunks and token usage to a collector
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Drain the stream, concatenating text and reasoning deltas.
    pub async fn collect_text(mut self) -> GenAiResult<CollectedText> {
        let mut collected = CollectedText::default();

        while let Some(part) = self.next().await {
            collected.push(part?);
        }
        Ok(collected)
    }

    fn complete(&mut self) {
        self.state = PartStreamState::Done;
        if let Some(finish) = self.aggregator.finish() {
            if let (Some(metrics), StreamPart::Finish { usage, .. }) = (&self.metrics, &finish) {
                metrics.record_tokens(usage);
                let dropped = self.interpreter.dropped_chunks();
                if dropped > 0 {
                    metrics.record_dropped_chunks(dropped);
                }
            }
            self.pending.push_back(finish);
        }
    }
}

impl fmt::Debug for PartStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartStream")
            .field("state", &self.state)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl Stream for PartStream {
    type Item = GenAiResult<StreamPart>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(part) = self.pending.pop_front() {
                return Poll::Ready(Some(Ok(part)));
            }

            if self.state == PartStreamState::Done {
                return Poll::Ready(None);
            }

            match Pin::new(&mut self.events).poll_next(cx) {
                Poll::Ready(Some(Ok(event))) => {
                    let this = &mut *self;
                    let interpretation = this.interpreter.interpret(&event.data);
                    this.aggregator.observe(&interpretation.summary);
                    this.pending.extend(interpretation.parts);
                }
                Poll::Ready(Some(Err(e))) => {
                    tracing::warn!(error = %e, "Stream interrupted");
                    self.state = PartStreamState::Done;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => self.complete(),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Everything a drained stream produced, flattened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedText {
    /// Concatenated text deltas
    pub text: String,
    /// Concatenated reasoning deltas
    pub reasoning: String,
    /// Tool calls in order
    pub tool_calls: Vec<ToolCall>,
    /// Reason from the finish part
    pub finish_reason: FinishReason,
    /// Usage from the finish part
    pub usage: UsageSnapshot,
}

impl CollectedText {
    /// Fold one part into the collection. Raw parts are ignored.
    pub fn push(&mut self, part: StreamPart) {
        match part {
            StreamPart::TextDelta { delta } => self.text.push_str(&delta),
            StreamPart::ReasoningDelta { delta } => self.reasoning.push_str(&delta),
            call @ StreamPart::ToolCall { .. } => self.tool_calls.extend(call.into_tool_call()),
            StreamPart::Finish { reason, usage } => {
                self.finish_reason = reason;
                self.usage = usage;
            }
            StreamPart::Raw { .. } => {}
        }
    }
}
