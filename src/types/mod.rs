//! Canonical, dialect-independent types shared across the crate.

use serde::{Deserialize, Serialize};

/// Normalized completion reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnifiedReason {
    /// Model finished naturally or hit a stop sequence
    Stop,
    /// Output token limit reached
    Length,
    /// Output withheld by a content filter
    ContentFilter,
    /// Model stopped to invoke tools
    ToolCalls,
    /// Upstream reported an error
    Error,
    /// Any reason without a dedicated mapping
    Other,
}

impl UnifiedReason {
    /// Map a raw upstream reason string, ignoring ASCII case.
    ///
    /// Never fails: unknown values map to `Other`.
    pub fn from_raw(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "STOP" | "COMPLETE" | "STOP_SEQUENCE" => UnifiedReason::Stop,
            "LENGTH" | "MAX_TOKENS" => UnifiedReason::Length,
            "CONTENT_FILTER" | "ERROR_TOXIC" => UnifiedReason::ContentFilter,
            "TOOL_CALLS" | "TOOL_CALL" => UnifiedReason::ToolCalls,
            "ERROR" | "ERROR_LIMIT" => UnifiedReason::Error,
            _ => UnifiedReason::Other,
        }
    }

    /// The kebab-case name of this reason
    pub fn as_str(&self) -> &'static str {
        match self {
            UnifiedReason::Stop => "stop",
            UnifiedReason::Length => "length",
            UnifiedReason::ContentFilter => "content-filter",
            UnifiedReason::ToolCalls => "tool-calls",
            UnifiedReason::Error => "error",
            UnifiedReason::Other => "other",
        }
    }
}

/// A finish reason: the normalized value plus the raw upstream string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishReason {
    /// Normalized reason
    pub unified: UnifiedReason,
    /// Reason exactly as the upstream sent it
    pub raw: String,
}

impl FinishReason {
    /// Build from a raw upstream reason string
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            unified: UnifiedReason::from_raw(&raw),
            raw,
        }
    }
}

/// Reason reported when the stream never carried one.
pub const DEFAULT_FINISH_REASON: &str = "STOP";

impl Default for FinishReason {
    fn default() -> Self {
        Self::from_raw(DEFAULT_FINISH_REASON)
    }
}

/// Token usage for a whole stream.
///
/// Optional counters stay `None` unless the upstream reported them at least once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    /// Tokens in the prompt
    pub prompt_tokens: u64,
    /// Tokens in the completion
    pub completion_tokens: u64,
    /// Tokens spent on reasoning
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_tokens: Option<u64>,
    /// Prediction tokens accepted by the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_prediction_tokens: Option<u64>,
    /// Prediction tokens rejected by the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_prediction_tokens: Option<u64>,
}

impl UsageSnapshot {
    /// Create a snapshot with only the required counters
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            ..Default::default()
        }
    }

    /// Prompt plus completion tokens
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// A complete tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    /// Call id, stable within the stream
    pub id: String,
    /// Tool name
    pub name: String,
    /// Arguments encoded as a JSON string
    pub arguments_json: String,
}

/// One canonical event of a completion stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPart {
    /// New assistant text
    TextDelta {
        /// Text fragment
        delta: String,
    },
    /// New reasoning/thinking text
    ReasoningDelta {
        /// Reasoning fragment
        delta: String,
    },
    /// A complete tool invocation
    ToolCall {
        /// Call id, stable within the stream
        id: String,
        /// Tool name
        name: String,
        /// Arguments encoded as a JSON string
        arguments_json: String,
    },
    /// Terminal summary; always the last part of a stream
    Finish {
        /// Completion reason
        reason: FinishReason,
        /// Accumulated usage
        usage: UsageSnapshot,
    },
    /// Parsed chunk passed through for diagnostics
    Raw {
        /// The chunk as parsed JSON
        value: serde_json::Value,
    },
}

impl StreamPart {
    /// Shorthand for a text delta
    pub fn text(delta: impl Into<String>) -> Self {
        StreamPart::TextDelta {
            delta: delta.into(),
        }
    }

    /// Shorthand for a reasoning delta
    pub fn reasoning(delta: impl Into<String>) -> Self {
        StreamPart::ReasoningDelta {
            delta: delta.into(),
        }
    }

    /// Returns true for the terminal finish part
    pub fn is_finish(&self) -> bool {
        matches!(self, StreamPart::Finish { .. })
    }

    /// The tool call carried by this part, if any
    pub fn into_tool_call(self) -> Option<ToolCall> {
        match self {
            StreamPart::ToolCall {
                id,
                name,
                arguments_json,
            } => Some(ToolCall {
                id,
                name,
                arguments_json,
            }),
            _ => None,
        }
    }

    /// Short label for logging and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            StreamPart::TextDelta { .. } => "text-delta",
            StreamPart::ReasoningDelta { .. } => "reasoning-delta",
            StreamPart::ToolCall { .. } => "tool-call",
            StreamPart::Finish { .. } => "finish",
            StreamPart::Raw { .. } => "raw",
        }
    }
}

/// How a request is routed to a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "servingType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServingMode {
    /// Shared on-demand capacity
    #[serde(rename_all = "camelCase")]
    OnDemand {
        /// Model identifier
        model_id: String,
    },
    /// Dedicated AI cluster endpoint
    #[serde(rename_all = "camelCase")]
    Dedicated {
        /// Endpoint OCID
        endpoint_id: String,
    },
}

impl ServingMode {
    /// On-demand serving for a model
    pub fn on_demand(model_id: impl Into<String>) -> Self {
        ServingMode::OnDemand {
            model_id: model_id.into(),
        }
    }

    /// Dedicated serving for an endpoint
    pub fn dedicated(endpoint_id: impl Into<String>) -> Self {
        ServingMode::Dedicated {
            endpoint_id: endpoint_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("STOP", UnifiedReason::Stop)]
    #[test_case("COMPLETE", UnifiedReason::Stop)]
    #[test_case("LENGTH", UnifiedReason::Length)]
    #[test_case("MAX_TOKENS", UnifiedReason::Length)]
    #[test_case("CONTENT_FILTER", UnifiedReason::ContentFilter)]
    #[test_case("TOOL_CALLS", UnifiedReason::ToolCalls)]
    #[test_case("ERROR", UnifiedReason::Error)]
    #[test_case("", UnifiedReason::Other ; "empty")]
    #[test_case("stop", UnifiedReason::Stop ; "lowercase stop")]
    #[test_case("tool_calls", UnifiedReason::ToolCalls ; "lowercase tool calls")]
    #[test_case("SOMETHING_NEW", UnifiedReason::Other)]
    fn test_unified_reason_mapping(raw: &str, expected: UnifiedReason) {
        assert_eq!(UnifiedReason::from_raw(raw), expected);
    }

    #[test]
    fn test_finish_reason_keeps_raw() {
        let reason = FinishReason::from_raw("CONTENT_FILTER");
        assert_eq!(reason.unified, UnifiedReason::ContentFilter);
        assert_eq!(reason.raw, "CONTENT_FILTER");
        assert_eq!(reason.unified.as_str(), "content-filter");
    }

    #[test]
    fn test_default_finish_reason() {
        let reason = FinishReason::default();
        assert_eq!(reason.unified, UnifiedReason::Stop);
        assert_eq!(reason.raw, "STOP");
    }

    #[test]
    fn test_usage_serialization_omits_unseen_fields() {
        let usage = UsageSnapshot::new(10, 5);
        let json = serde_json::to_value(&usage).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"promptTokens": 10, "completionTokens": 5})
        );
        assert_eq!(usage.total_tokens(), 15);
    }

    #[test]
    fn test_total_tokens_saturates() {
        let usage = UsageSnapshot::new(u64::MAX, 7);
        assert_eq!(usage.total_tokens(), u64::MAX);
    }

    #[test]
    fn test_serving_mode_serialization() {
        let json = serde_json::to_value(ServingMode::on_demand("cohere.command-r-plus")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"servingType": "ON_DEMAND", "modelId": "cohere.command-r-plus"})
        );

        let json = serde_json::to_value(ServingMode::dedicated("ocid1.endpoint.oc1..x")).unwrap();
        assert_eq!(json["servingType"], "DEDICATED");
        assert_eq!(json["endpointId"], "ocid1.endpoint.oc1..x");
    }
}
