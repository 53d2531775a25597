//! Chunk interpreter: one event payload in, canonical parts out.

use super::dialects::{
    Choice, ChoicesBody, ChunkDialect, CohereBody, CohereToolCall, GenericBody, GenericToolCall,
    Message, MessageContent, ResponseBody, WireUsage,
};
use crate::types::StreamPart;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

/// Usage counters seen in one chunk; `None` means the chunk did not carry it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageUpdate {
    /// Tokens in the prompt
    pub prompt_tokens: Option<u64>,
    /// Tokens in the completion
    pub completion_tokens: Option<u64>,
    /// Tokens spent on reasoning
    pub reasoning_tokens: Option<u64>,
    /// Prediction tokens accepted
    pub accepted_prediction_tokens: Option<u64>,
    /// Prediction tokens rejected
    pub rejected_prediction_tokens: Option<u64>,
}

impl UsageUpdate {
    fn merge(&mut self, wire: WireUsage) {
        let details = wire.completion_tokens_details.unwrap_or_default();
        overwrite(&mut self.prompt_tokens, wire.prompt_tokens);
        overwrite(&mut self.completion_tokens, wire.completion_tokens);
        overwrite(&mut self.reasoning_tokens, details.reasoning_tokens);
        overwrite(
            &mut self.accepted_prediction_tokens,
            details.accepted_prediction_tokens,
        );
        overwrite(
            &mut self.rejected_prediction_tokens,
            details.rejected_prediction_tokens,
        );
    }
}

/// Finish reason and usage fields carried by one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSummary {
    /// Raw finish reason, if present
    pub finish_reason: Option<String>,
    /// Usage counters, if present
    pub usage: Option<UsageUpdate>,
}

impl ChunkSummary {
    /// True when the chunk carried neither a reason nor usage
    pub fn is_empty(&self) -> bool {
        self.finish_reason.is_none() && self.usage.is_none()
    }

    fn record_reason(&mut self, reason: Option<String>) {
        if let Some(reason) = reason.filter(|r| !r.is_empty()) {
            self.finish_reason = Some(reason);
        }
    }

    fn record_usage(&mut self, usage: Option<WireUsage>) {
        if let Some(wire) = usage {
            self.usage.get_or_insert_with(UsageUpdate::default).merge(wire);
        }
    }
}

/// Result of interpreting one chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interpretation {
    /// Parts derived from the chunk, in encounter order
    pub parts: Vec<StreamPart>,
    /// Finish/usage fields for the aggregator
    pub summary: ChunkSummary,
}

impl Interpretation {
    /// True when the chunk produced nothing at all
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty() && self.summary.is_empty()
    }
}

/// Synthesizes tool-call ids unique within one stream.
///
/// Ids combine an opaque per-stream identifier with a monotonically
/// increasing sequence number, so calls interpreted back to back never
/// collide.
#[derive(Debug, Clone)]
pub struct ToolCallIdGenerator {
    stream_id: String,
    next: u64,
}

impl ToolCallIdGenerator {
    /// Create a generator with a fresh stream identifier
    pub fn new() -> Self {
        Self {
            stream_id: Uuid::new_v4().simple().to_string(),
            next: 0,
        }
    }

    /// The next id
    pub fn next_id(&mut self) -> String {
        let id = format!("call_{}_{}", self.stream_id, self.next);
        self.next += 1;
        id
    }
}

impl Default for ToolCallIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns chunk payloads from any recognized dialect into [`StreamPart`]s.
///
/// One interpreter serves one stream: it owns the tool-call id sequence.
#[derive(Debug, Clone, Default)]
pub struct ChunkInterpreter {
    ids: ToolCallIdGenerator,
    include_raw: bool,
    dropped: u64,
}

impl ChunkInterpreter {
    /// Create an interpreter for a new stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit each parsed chunk as a raw part ahead of its derived parts
    pub fn with_raw_chunks(mut self, include_raw: bool) -> Self {
        self.include_raw = include_raw;
        self
    }

    /// Chunks dropped so far as malformed or unrecognized
    pub fn dropped_chunks(&self) -> u64 {
        self.dropped
    }

    /// Interpret one event payload.
    ///
    /// Never fails: a payload that is not JSON, or JSON in no recognized
    /// shape, yields an empty interpretation.
    pub fn interpret(&mut self, data: &str) -> Interpretation {
        match serde_json::from_str::<Value>(data) {
            Ok(value) => self.interpret_value(value),
            Err(e) => {
                self.dropped += 1;
                tracing::debug!(error = %e, len = data.len(), "Dropping malformed chunk");
                Interpretation::default()
            }
        }
    }

    /// Interpret an already-parsed chunk.
    pub fn interpret_value(&mut self, value: Value) -> Interpretation {
        let dialect = ChunkDialect::deserialize(&value);

        let mut out = Interpretation::default();
        if self.include_raw {
            out.parts.push(StreamPart::Raw { value });
        }

        match dialect {
            Ok(ChunkDialect::Enveloped(envelope)) => {
                self.body(envelope.chat_result.chat_response, &mut out)
            }
            Ok(ChunkDialect::Legacy(envelope)) => self.body(envelope.chat_response, &mut out),
            Ok(ChunkDialect::Body(body)) => self.body(body, &mut out),
            Err(e) => {
                self.dropped += 1;
                tracing::debug!(error = %e, "Dropping chunk in unrecognized shape");
            }
        }
        out
    }

    fn body(&mut self, body: ResponseBody, out: &mut Interpretation) {
        match body {
            ResponseBody::Choices(body) => self.choices(body, out),
            ResponseBody::Generic(body) => self.generic(body, out),
            ResponseBody::Cohere(body) => self.cohere(body, out),
        }
    }

    fn choices(&mut self, body: ChoicesBody, out: &mut Interpretation) {
        for Choice {
            message,
            finish_reason,
        } in body.choices
        {
            if let Some(message) = message {
                self.message(message, out);
            }
            out.summary.record_reason(finish_reason);
        }
        out.summary.record_usage(body.usage);
    }

    fn generic(&mut self, body: GenericBody, out: &mut Interpretation) {
        self.message(body.message, out);
        out.summary.record_reason(body.finish_reason);
        out.summary.record_usage(body.usage);
    }

    fn cohere(&mut self, body: CohereBody, out: &mut Interpretation) {
        push_text(&mut out.parts, body.text);
        for call in body.tool_calls.unwrap_or_default() {
            let part = self.implicit_tool_call(call);
            out.parts.push(part);
        }
        out.summary.record_reason(body.finish_reason);
        out.summary.record_usage(body.usage);
    }

    fn message(&mut self, message: Message, out: &mut Interpretation) {
        if let Some(reasoning) = message.reasoning_content.filter(|r| !r.is_empty()) {
            out.parts.push(StreamPart::reasoning(reasoning));
        }

        match message.content {
            Some(MessageContent::Text(text)) => push_text(&mut out.parts, Some(text)),
            Some(MessageContent::Entries(entries)) => {
                for entry in entries {
                    match entry.kind.as_deref() {
                        None | Some("TEXT") => push_text(&mut out.parts, entry.text),
                        Some("THINKING") => {
                            if let Some(thinking) = entry.thinking.or(entry.text) {
                                if !thinking.is_empty() {
                                    out.parts.push(StreamPart::reasoning(thinking));
                                }
                            }
                        }
                        Some(_) => {}
                    }
                }
            }
            None => {}
        }

        for call in message.tool_calls.unwrap_or_default() {
            if let Some(part) = self.explicit_tool_call(call) {
                out.parts.push(part);
            }
        }
    }

    fn explicit_tool_call(&mut self, call: GenericToolCall) -> Option<StreamPart> {
        let (name, arguments) = match call.function {
            Some(function) => (function.name.or(call.name), function.arguments.or(call.arguments)),
            None => (call.name, call.arguments),
        };
        let name = name.filter(|n| !n.is_empty())?;

        Some(StreamPart::ToolCall {
            id: call
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| self.ids.next_id()),
            name,
            arguments_json: encode_arguments(arguments),
        })
    }

    fn implicit_tool_call(&mut self, call: CohereToolCall) -> StreamPart {
        StreamPart::ToolCall {
            id: self.ids.next_id(),
            name: call.name,
            arguments_json: encode_arguments(call.parameters),
        }
    }
}

fn push_text(parts: &mut Vec<StreamPart>, text: Option<String>) {
    if let Some(text) = text.filter(|t| !t.is_empty()) {
        parts.push(StreamPart::text(text));
    }
}

/// Arguments arrive either as a JSON string or as structured JSON.
fn encode_arguments(arguments: Option<Value>) -> String {
    match arguments {
        Some(Value::String(encoded)) => encoded,
        Some(Value::Null) | None => "{}".to_string(),
        Some(structured) => structured.to_string(),
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}
