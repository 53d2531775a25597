//! Mock transport for unit tests.
//!
//! Responses are scripted in order; every call is recorded so tests can
//! assert on attempts, URLs, headers and bodies.

use crate::errors::{GenAiError, GenAiResult};
use crate::transport::{
    map_http_error, ByteStream, HttpTransport, StreamingResponse, TransportResponse,
};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use parking_lot::Mutex;
use std::collections::VecDeque;
use url::Url;

/// A scripted outcome for one call
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Successful response whose body arrives in these chunks
    Body {
        /// HTTP status code
        status: u16,
        /// Response headers
        headers: HeaderMap,
        /// Body chunks, in arrival order
        chunks: Vec<Bytes>,
    },
    /// Successful response whose body fails after these chunks
    Interrupted {
        /// Chunks delivered before the failure
        chunks: Vec<Bytes>,
        /// Message of the read failure
        message: String,
    },
    /// Non-success HTTP response
    Status {
        /// HTTP status code
        status: u16,
        /// Response headers
        headers: HeaderMap,
        /// Response body
        body: Bytes,
    },
    /// The call fails before a response
    Fail(GenAiError),
    /// The call never completes
    Hang,
}

impl MockResponse {
    /// Successful SSE response from string chunks
    pub fn sse(chunks: &[&str]) -> Self {
        MockResponse::Body {
            status: 200,
            headers: HeaderMap::new(),
            chunks: chunks.iter().map(|c| Bytes::from(c.to_string())).collect(),
        }
    }

    /// Successful JSON response
    pub fn json(value: &serde_json::Value) -> Self {
        MockResponse::Body {
            status: 200,
            headers: HeaderMap::new(),
            chunks: vec![Bytes::from(value.to_string())],
        }
    }

    /// Error response with a `{"message": ...}` body
    pub fn error(status: u16, message: &str) -> Self {
        MockResponse::Status {
            status,
            headers: HeaderMap::new(),
            body: Bytes::from(serde_json::json!({ "message": message }).to_string()),
        }
    }

    /// Add a response header
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let MockResponse::Body { headers, .. } | MockResponse::Status { headers, .. } = &mut self
        {
            headers.insert(name, HeaderValue::from_str(value).unwrap());
        }
        self
    }
}

/// A recorded request
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// HTTP method
    pub method: Method,
    /// Request URL
    pub url: String,
    /// Request headers
    pub headers: HeaderMap,
    /// Request body
    pub body: Option<Vec<u8>>,
}

impl MockRequest {
    /// Body parsed as JSON
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(self.body.as_deref().unwrap_or(b"null")).unwrap()
    }
}

/// Mock HTTP transport for testing
#[derive(Default)]
pub struct MockHttpTransport {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<MockRequest>>,
}

impl MockHttpTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response to return
    pub fn add_response(&self, response: MockResponse) {
        self.responses.lock().push_back(response);
    }

    /// Builder form of [`add_response`](Self::add_response)
    pub fn with_response(self, response: MockResponse) -> Self {
        self.add_response(response);
        self
    }

    /// Get recorded requests
    pub fn get_requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    /// Get the last request
    pub fn last_request(&self) -> Option<MockRequest> {
        self.requests.lock().last().cloned()
    }

    /// Number of calls made
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn record(&self, method: Method, url: Url, headers: HeaderMap, body: Option<Bytes>) -> MockResponse {
        self.requests.lock().push(MockRequest {
            method,
            url: url.to_string(),
            headers,
            body: body.map(|b| b.to_vec()),
        });

        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| MockResponse::error(500, "No mock response configured"))
    }
}

async fn resolve(response: MockResponse) -> GenAiResult<StreamingResponse> {
    match response {
        MockResponse::Body {
            status,
            headers,
            chunks,
        } => {
            let body: ByteStream = Box::pin(futures::stream::iter(chunks.into_iter().map(Ok)));
            Ok(StreamingResponse {
                status,
                headers,
                body: Some(body),
            })
        }
        MockResponse::Interrupted { chunks, message } => {
            let items = chunks
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(GenAiError::StreamError { message })));
            let body: ByteStream = Box::pin(futures::stream::iter(items));
            Ok(StreamingResponse {
                status: 200,
                headers: HeaderMap::new(),
                body: Some(body),
            })
        }
        MockResponse::Status {
            status,
            headers,
            body,
        } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            Err(map_http_error(status, &headers, &body))
        }
        MockResponse::Fail(error) => Err(error),
        MockResponse::Hang => futures::future::pending().await,
    }
}

#[async_trait]
impl HttpTransport for MockHttpTransport {
    async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> GenAiResult<TransportResponse> {
        let response = resolve(self.record(method, url, headers, body)).await?;
        let mut collected = Vec::new();
        if let Some(mut stream) = response.body {
            use futures::StreamExt;
            while let Some(chunk) = stream.next().await {
                collected.extend_from_slice(&chunk?);
            }
        }

        Ok(TransportResponse {
            status: response.status,
            headers: response.headers,
            body: Bytes::from(collected),
        })
    }

    async fn send_streaming(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> GenAiResult<StreamingResponse> {
        resolve(self.record(method, url, headers, body)).await
    }
}
