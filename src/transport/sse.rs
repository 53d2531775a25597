//! Server-Sent Events (SSE) framing and streaming.
//!
//! Bytes are buffered raw and only decoded once a full line is available, so
//! a multi-byte character split across reads is reassembled before decoding.

use crate::errors::{GenAiError, GenAiResult};
use crate::transport::ByteStream;
use futures::stream::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Event type used when a frame carries no `event:` field.
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// Payload marking the end of a stream; dropped by the parser.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A parsed SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type (from "event:" field, `message` when absent)
    pub event: String,
    /// Event data (from "data:" fields, joined with newlines)
    pub data: String,
    /// Event ID (from "id:" field)
    pub id: Option<String>,
    /// Retry timeout in milliseconds (from "retry:" field)
    pub retry: Option<u64>,
}

impl SseEvent {
    /// Create a new SSE event with just data
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            event: DEFAULT_EVENT_TYPE.to_string(),
            data: data.into(),
            id: None,
            retry: None,
        }
    }

    /// Create a new SSE event with event type and data
    pub fn with_event(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ..Self::new(data)
        }
    }

    /// Check if this is an error event
    pub fn is_error(&self) -> bool {
        self.event == "error"
    }

    /// Check if the payload is the termination sentinel
    pub fn is_done(&self) -> bool {
        self.data.trim() == DONE_SENTINEL
    }
}

/// Incremental SSE parser.
///
/// Accepts byte buffers of any size and alignment and returns the events
/// completed by each one.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    // Bytes of `buffer` already known to hold no newline.
    scanned: usize,
    current_event: Option<String>,
    current_data: Vec<String>,
    has_data: bool,
    current_id: Option<String>,
    current_retry: Option<u64>,
}

impl SseParser {
    /// Create a new SSE parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed data into the parser and get any complete events
    pub fn feed(&mut self, data: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(data);

        let mut events = Vec::new();
        let mut start = 0;
        let mut search_from = self.scanned;

        while let Some(offset) = self.buffer[search_from..].iter().position(|b| *b == b'\n') {
            let end = search_from + offset;
            let mut line = &self.buffer[start..end];
            if let [rest @ .., b'\r'] = line {
                line = rest;
            }
            let line = String::from_utf8_lossy(line).into_owned();
            start = end + 1;
            search_from = start;

            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        events
    }

    /// Finish parsing at end of input.
    ///
    /// A trailing line without a newline is processed, and a frame that saw a
    /// `data:` field but no closing blank line is still emitted.
    pub fn flush(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let mut remaining = std::mem::take(&mut self.buffer);
            self.scanned = 0;
            if remaining.last() == Some(&b'\r') {
                remaining.pop();
            }
            let line = String::from_utf8_lossy(&remaining).into_owned();
            if let Some(event) = self.process_line(&line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }

        // Comment line
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.current_event = Some(value.to_string()),
            "data" => {
                self.current_data.push(value.to_string());
                self.has_data = true;
            }
            "id" => self.current_id = Some(value.to_string()),
            "retry" => {
                if let Ok(retry) = value.trim().parse() {
                    self.current_retry = Some(retry);
                }
            }
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event_type = self.current_event.take();
        let id = self.current_id.take();
        let retry = self.current_retry.take();

        if !std::mem::take(&mut self.has_data) {
            return None;
        }

        let event = SseEvent {
            event: event_type.unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
            data: self.current_data.join("\n"),
            id,
            retry,
        };
        self.current_data.clear();

        if event.is_done() {
            tracing::trace!("Skipping stream termination sentinel");
            return None;
        }
        Some(event)
    }
}

/// A stream of SSE events framed from a byte stream
pub struct SseStream {
    inner: ByteStream,
    parser: SseParser,
    pending_events: VecDeque<SseEvent>,
    done: bool,
}

impl std::fmt::Debug for SseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseStream")
            .field("parser", &self.parser)
            .field("pending_events", &self.pending_events)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl SseStream {
    /// Create a new SSE stream from a byte stream
    pub fn new(inner: ByteStream) -> Self {
        Self {
            inner,
            parser: SseParser::new(),
            pending_events: VecDeque::new(),
            done: false,
        }
    }

    /// Create a stream from a response body that may be missing.
    ///
    /// Fails with a configuration error before any event is produced when
    /// there is no body to read.
    pub fn from_body(body: Option<ByteStream>) -> GenAiResult<Self> {
        body.map(Self::new).ok_or_else(|| GenAiError::Configuration {
            message: "Response body is not readable".to_string(),
        })
    }
}

impl Stream for SseStream {
    type Item = GenAiResult<SseEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if let Some(event) = self.pending_events.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }

            if self.done {
                return Poll::Ready(None);
            }

            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let events = self.parser.feed(&bytes);
                    self.pending_events.extend(events);
                }
                Poll::Ready(Some(Err(e))) => {
                    self.done = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    self.done = true;
                    if let Some(event) = self.parser.flush() {
                        self.pending_events.push_back(event);
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
