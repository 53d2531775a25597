//! Client for the OCI Generative AI chat action.

mod stream;
mod types;

pub use stream::ChatStream;
pub use types::{ChatRequest, ChatResponse};

use crate::config::{GenAiConfig, RequestOptions};
use crate::errors::{ApiCallError, GenAiError, GenAiResult};
use crate::observability::{MetricsCollector, NoopMetricsCollector};
use crate::resilience::ResilienceExecutor;
use crate::streaming::{ChunkInterpreter, CollectedText, FinishAggregator, PartStream};
use crate::transport::{HttpTransport, ReqwestTransport};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, Method};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

const CHAT_STREAM_OPERATION: &str = "chat_stream";
const CHAT_OPERATION: &str = "chat";
const REQUEST_ID_HEADER: &str = "opc-request-id";

/// Client for the chat action of one inference endpoint.
///
/// The HTTP transport is created on first use and reused for every call
/// made through this client.
pub struct GenAiClient {
    config: Arc<GenAiConfig>,
    transport: OnceCell<Arc<dyn HttpTransport>>,
    metrics: Arc<dyn MetricsCollector>,
}

impl GenAiClient {
    /// Create a new client from configuration
    pub fn new(config: GenAiConfig) -> Self {
        Self {
            config: Arc::new(config),
            transport: OnceCell::new(),
            metrics: Arc::new(NoopMetricsCollector),
        }
    }

    /// Create a client from environment variables
    pub fn from_env() -> GenAiResult<Self> {
        GenAiConfig::from_env().map(Self::new)
    }

    /// Create a client over an existing transport
    pub fn with_transport(config: GenAiConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            config: Arc::new(config),
            transport: OnceCell::with_value(transport),
            metrics: Arc::new(NoopMetricsCollector),
        }
    }

    /// Report attempts, failures and token usage to `metrics`
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &GenAiConfig {
        &self.config
    }

    /// Get the metrics collector
    pub fn metrics(&self) -> Arc<dyn MetricsCollector> {
        self.metrics.clone()
    }

    fn transport(&self) -> GenAiResult<Arc<dyn HttpTransport>> {
        self.transport
            .get_or_try_init(|| {
                let connect_timeout = self.config.resolve(None)?.timeout();
                tracing::debug!(
                    connect_timeout_ms = connect_timeout.as_millis() as u64,
                    "Creating HTTP transport"
                );
                let transport = ReqwestTransport::new(connect_timeout)?;
                Ok(Arc::new(transport) as Arc<dyn HttpTransport>)
            })
            .cloned()
    }

    /// Open a streaming chat call.
    ///
    /// Establishment runs under the resolved timeout and retry policy. Once
    /// the stream is returned, read failures surface as stream items and are
    /// not retried.
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
        options: Option<&RequestOptions>,
    ) -> Result<ChatStream, ApiCallError> {
        let (url, headers, body, executor) = self
            .prepare(request, options, true)
            .map_err(|e| self.fail(CHAT_STREAM_OPERATION, e))?;

        let response = self
            .establish(CHAT_STREAM_OPERATION, &executor, |transport| {
                let (url, headers, body) = (url.clone(), headers.clone(), body.clone());
                async move {
                    transport
                        .send_streaming(Method::POST, url, headers, Some(body))
                        .await
                }
            })
            .await?;

        let parts = PartStream::from_body(response.body)
            .map_err(|e| self.fail(CHAT_STREAM_OPERATION, e))?
            .with_raw_chunks(self.config.include_raw_chunks)
            .with_metrics(self.metrics.clone());

        Ok(ChatStream::new(parts, response.headers))
    }

    /// Send a non-streaming chat call and interpret the full response.
    pub async fn chat(
        &self,
        request: &ChatRequest,
        options: Option<&RequestOptions>,
    ) -> Result<ChatResponse, ApiCallError> {
        let (url, headers, body, executor) = self
            .prepare(request, options, false)
            .map_err(|e| self.fail(CHAT_OPERATION, e))?;

        let response = self
            .establish(CHAT_OPERATION, &executor, |transport| {
                let (url, headers, body) = (url.clone(), headers.clone(), body.clone());
                async move { transport.send(Method::POST, url, headers, Some(body)).await }
            })
            .await?;

        let raw: Value = serde_json::from_slice(&response.body)
            .map_err(|e| self.fail(CHAT_OPERATION, e.into()))?;
        let output = self
            .interpret_response(&raw)
            .map_err(|e| self.fail(CHAT_OPERATION, e))?;

        Ok(ChatResponse {
            output,
            request_id: response
                .headers
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            raw,
        })
    }

    fn prepare(
        &self,
        request: &ChatRequest,
        options: Option<&RequestOptions>,
        is_stream: bool,
    ) -> GenAiResult<(Url, HeaderMap, Bytes, ResilienceExecutor)> {
        let details = request
            .clone()
            .into_details(self.config.compartment_id.as_deref(), is_stream)?;
        let resolved = self.config.resolve(options)?;
        let url = Url::parse(&self.config.chat_url())?;
        let headers = self.build_headers(is_stream)?;
        let body = Bytes::from(serde_json::to_vec(&details)?);

        Ok((url, headers, body, ResilienceExecutor::from_options(&resolved)))
    }

    fn build_headers(&self, is_stream: bool) -> GenAiResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(if is_stream {
                "text/event-stream"
            } else {
                "application/json"
            }),
        );

        let request_id = uuid::Uuid::new_v4().simple().to_string();
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            headers.insert(REQUEST_ID_HEADER, value);
        }

        for (name, value) in &self.config.custom_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                GenAiError::Configuration {
                    message: format!("Invalid header name '{}': {}", name, e),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| GenAiError::Configuration {
                message: format!("Invalid value for header '{}': {}", name, e),
            })?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    async fn establish<F, Fut, T>(
        &self,
        operation: &str,
        executor: &ResilienceExecutor,
        send: F,
    ) -> Result<T, ApiCallError>
    where
        F: Fn(Arc<dyn HttpTransport>) -> Fut,
        Fut: std::future::Future<Output = GenAiResult<T>>,
    {
        let transport = self.transport().map_err(|e| self.fail(operation, e))?;
        let started = Instant::now();
        let mut attempts: u32 = 0;

        let result = executor
            .execute(operation, || {
                if attempts > 0 {
                    self.metrics.record_retry(operation);
                }
                attempts += 1;
                self.metrics.record_attempt(operation);
                send(transport.clone())
            })
            .await;

        match result {
            Ok(value) => {
                self.metrics
                    .record_success(operation, started.elapsed().as_millis() as u64);
                Ok(value)
            }
            Err(error) => Err(self.fail(operation, error)),
        }
    }

    fn interpret_response(&self, raw: &Value) -> GenAiResult<CollectedText> {
        if raw.get("chatResult").is_none() && raw.get("chatResponse").is_none() {
            return Err(GenAiError::Internal {
                message: "No chat response received from OCI.".to_string(),
            });
        }

        let mut interpreter = ChunkInterpreter::new();
        let mut aggregator = FinishAggregator::new();
        let mut output = CollectedText::default();

        let interpretation = interpreter.interpret_value(raw.clone());
        aggregator.observe(&interpretation.summary);
        for part in interpretation.parts {
            output.push(part);
        }
        if let Some(finish) = aggregator.finish() {
            output.push(finish);
        }

        self.metrics.record_tokens(&output.usage);
        Ok(output)
    }

    fn fail(&self, operation: &str, error: GenAiError) -> ApiCallError {
        let error = ApiCallError::from(error);
        if matches!(*error.cause, GenAiError::Timeout { .. }) {
            self.metrics.record_timeout(operation);
        }
        self.metrics.record_failure(operation, error.category.as_str());
        tracing::warn!(
            operation,
            category = error.category.as_str(),
            status = ?error.status_code,
            retryable = error.retryable,
            "Chat call failed"
        );
        error
    }
}

impl fmt::Debug for GenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenAiClient")
            .field("config", &self.config)
            .field("transport_initialized", &self.transport.get().is_some())
            .finish_non_exhaustive()
    }
}

/// Create a new client from configuration
pub fn create_client(config: GenAiConfig) -> GenAiClient {
    GenAiClient::new(config)
}

/// Create a new client from environment variables
pub fn create_client_from_env() -> GenAiResult<GenAiClient> {
    GenAiClient::from_env()
}

static DEFAULT_CLIENT: OnceCell<GenAiClient> = OnceCell::new();

/// The process-wide client built from the environment.
///
/// Built on first access; a construction failure is returned to that caller
/// and construction is attempted again on the next access.
pub fn default_client() -> GenAiResult<&'static GenAiClient> {
    DEFAULT_CLIENT.get_or_try_init(GenAiClient::from_env)
}
