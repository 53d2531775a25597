//! Request and response types for the chat action.

use crate::errors::{GenAiError, GenAiResult, ValidationDetail};
use crate::streaming::CollectedText;
use crate::types::ServingMode;
use serde::Serialize;
use serde_json::Value;

/// A chat call: where to route it and the caller-shaped chat request.
///
/// The chat request body (`apiFormat`, `messages` or `message`, sampling
/// parameters, tools) is passed through as given; only `isStream` is set by
/// the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Model routing
    pub serving_mode: ServingMode,
    /// Compartment override; falls back to the client configuration
    pub compartment_id: Option<String>,
    /// The chat request body
    pub chat_request: Value,
}

impl ChatRequest {
    /// Create a request for a serving mode and chat body
    pub fn new(serving_mode: ServingMode, chat_request: Value) -> Self {
        Self {
            serving_mode,
            compartment_id: None,
            chat_request,
        }
    }

    /// Override the compartment
    pub fn with_compartment_id(mut self, compartment_id: impl Into<String>) -> Self {
        self.compartment_id = Some(compartment_id.into());
        self
    }

    /// Check the request before any network call.
    pub fn validate(&self) -> GenAiResult<()> {
        let mut details = Vec::new();

        match &self.serving_mode {
            ServingMode::OnDemand { model_id } if model_id.trim().is_empty() => {
                details.push(ValidationDetail::new("servingMode.modelId", "must not be empty"));
            }
            ServingMode::Dedicated { endpoint_id } if endpoint_id.trim().is_empty() => {
                details.push(ValidationDetail::new(
                    "servingMode.endpointId",
                    "dedicated serving mode requires an endpoint id",
                ));
            }
            _ => {}
        }

        if !self.chat_request.is_object() {
            details.push(ValidationDetail::new("chatRequest", "must be a JSON object"));
        }

        if details.is_empty() {
            return Ok(());
        }

        Err(GenAiError::Validation {
            message: details
                .iter()
                .map(|d| format!("{}: {}", d.field, d.message))
                .collect::<Vec<_>>()
                .join("; "),
            details,
        })
    }

    pub(crate) fn into_details(
        self,
        default_compartment: Option<&str>,
        is_stream: bool,
    ) -> GenAiResult<ChatDetails> {
        self.validate()?;

        let compartment_id = self
            .compartment_id
            .filter(|c| !c.is_empty())
            .or_else(|| default_compartment.map(str::to_string))
            .ok_or_else(|| GenAiError::Configuration {
                message: "compartmentId is required: set it on the request or via OCI_COMPARTMENT_ID"
                    .to_string(),
            })?;

        let mut chat_request = self.chat_request;
        if let Value::Object(fields) = &mut chat_request {
            fields.insert("isStream".to_string(), Value::Bool(is_stream));
        }

        Ok(ChatDetails {
            compartment_id,
            serving_mode: self.serving_mode,
            chat_request,
        })
    }
}

/// Body of the chat action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChatDetails {
    pub compartment_id: String,
    pub serving_mode: ServingMode,
    pub chat_request: Value,
}

/// Result of a non-streaming chat call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    /// Text, reasoning, tool calls, finish reason and usage
    pub output: CollectedText,
    /// Value of the `opc-request-id` response header
    pub request_id: Option<String>,
    /// The response body as returned
    pub raw: Value,
}

impl ChatResponse {
    /// The generated text
    pub fn text(&self) -> &str {
        &self.output.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_details_shape() {
        let details = ChatRequest::new(
            ServingMode::on_demand("cohere.command-r-plus"),
            json!({"apiFormat": "COHERE", "message": "hi"}),
        )
        .into_details(Some("ocid1.compartment.oc1..x"), true)
        .unwrap();

        assert_eq!(
            serde_json::to_value(&details).unwrap(),
            json!({
                "compartmentId": "ocid1.compartment.oc1..x",
                "servingMode": {"servingType": "ON_DEMAND", "modelId": "cohere.command-r-plus"},
                "chatRequest": {"apiFormat": "COHERE", "message": "hi", "isStream": true}
            })
        );
    }

    #[test]
    fn test_request_compartment_overrides_default() {
        let details = ChatRequest::new(ServingMode::on_demand("m"), json!({}))
            .with_compartment_id("ocid1.compartment.oc1..request")
            .into_details(Some("ocid1.compartment.oc1..default"), false)
            .unwrap();
        assert_eq!(details.compartment_id, "ocid1.compartment.oc1..request");
        assert_eq!(details.chat_request["isStream"], json!(false));
    }

    #[test]
    fn test_missing_compartment() {
        let result = ChatRequest::new(ServingMode::on_demand("m"), json!({})).into_details(None, true);
        assert!(matches!(result, Err(GenAiError::Configuration { .. })));
    }

    #[test]
    fn test_dedicated_without_endpoint_is_invalid() {
        let err = ChatRequest::new(ServingMode::dedicated(""), json!({}))
            .validate()
            .unwrap_err();
        match err {
            GenAiError::Validation { details, .. } => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "servingMode.endpointId");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_non_object_chat_request_is_invalid() {
        let result = ChatRequest::new(ServingMode::on_demand("m"), json!("hello")).validate();
        assert!(result.is_err());
    }
}
