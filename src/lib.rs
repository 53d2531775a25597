//! # OCI Generative AI streaming client
//!
//! Turns the server-sent-event stream of the OCI Generative AI chat action
//! into an ordered stream of typed parts, whatever dialect the model family
//! speaks.
//!
//! ## Features
//!
//! - SSE framing that is independent of how the body is split into reads
//! - Chunk interpretation for the GENERIC, COHERE and choice-array dialects,
//!   bare or wrapped in `chatResult`/`chatResponse` envelopes
//! - Exactly one terminal `Finish` part carrying the last reported finish
//!   reason and token usage
//! - Per-attempt timeout and exponential-backoff retry around connection
//!   establishment, configurable per client and per call
//! - Structured logging with `tracing` and a pluggable metrics collector
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use integrations_oci_genai::{ChatRequest, GenAiClient, GenAiConfig, ServingMode, StreamPart};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GenAiConfig::builder()
//!         .region("us-chicago-1")
//!         .compartment_id("ocid1.compartment.oc1..example")
//!         .build()?;
//!     let client = GenAiClient::new(config);
//!
//!     let request = ChatRequest::new(
//!         ServingMode::on_demand("meta.llama-3.3-70b-instruct"),
//!         json!({
//!             "apiFormat": "GENERIC",
//!             "messages": [{"role": "USER", "content": [{"type": "TEXT", "text": "Hello"}]}]
//!         }),
//!     );
//!
//!     let mut stream = client.chat_stream(&request, None).await?;
//!     while let Some(part) = stream.next().await {
//!         match part? {
//!             StreamPart::TextDelta { delta } => print!("{}", delta),
//!             StreamPart::Finish { reason, usage } => {
//!                 println!("\n[{}] {} tokens", reason.unified.as_str(), usage.total_tokens())
//!             }
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - `client` - Client, request/response types and the process-wide default client
//! - `config` - Configuration, request options and their resolution
//! - `transport` - HTTP transport layer and SSE framing
//! - `streaming` - Chunk interpreter, finish aggregator and part stream
//! - `errors` - Error types and taxonomy
//! - `types` - Stream parts, finish reasons, usage and serving modes
//! - `resilience` - Timeout and retry
//! - `observability` - Logging and metrics

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod errors;
pub mod observability;
pub mod resilience;
pub mod streaming;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mocks;

pub use client::{
    create_client, create_client_from_env, default_client, ChatRequest, ChatResponse, ChatStream,
    GenAiClient,
};
pub use config::{
    resolve_request_options, GenAiConfig, GenAiConfigBuilder, RequestOptions,
    ResolvedRequestOptions, RetryOptions, RetrySettings,
};
pub use errors::{ApiCallError, ErrorCategory, GenAiError, GenAiResult};
pub use observability::{
    init_logging, InMemoryMetricsCollector, LogFormat, LogLevel, LoggingConfig, MetricsCollector,
    NoopMetricsCollector,
};
pub use resilience::{
    default_is_retryable, ErrorSignal, ResilienceConfig, ResilienceExecutor, RetryPolicy,
    TimeoutError,
};
pub use streaming::{
    ChunkInterpreter, CollectedText, FinishAggregator, Interpretation, PartStream,
};
pub use transport::{HttpTransport, ReqwestTransport, SseEvent, SseParser, SseStream};
pub use types::{FinishReason, ServingMode, StreamPart, ToolCall, UnifiedReason, UsageSnapshot};
