//! HTTP transport implementations.

use crate::errors::{ApiErrorResponse, GenAiError, GenAiResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use http::{HeaderMap, Method, StatusCode};
use reqwest::Client;
use std::fmt;
use std::pin::Pin;
use std::time::Duration;
use url::Url;

/// A stream of body chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = GenAiResult<Bytes>> + Send>>;

/// Response from HTTP transport
#[derive(Debug)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
}

/// Response whose body is consumed incrementally.
pub struct StreamingResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body; `None` when the response carries nothing to read
    pub body: Option<ByteStream>,
}

impl fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|_| "<stream>"))
            .finish()
    }
}

/// HTTP transport trait for making requests to the inference endpoint.
///
/// Implementations map non-success statuses to [`GenAiError`] before
/// returning, so callers only see successful responses.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a regular HTTP request
    async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> GenAiResult<TransportResponse>;

    /// Send a request whose response body is streamed
    async fn send_streaming(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> GenAiResult<StreamingResponse>;
}

/// Reqwest-based HTTP transport implementation.
///
/// No total request timeout is set on the client: the resilience layer bounds
/// connection establishment, and an open stream may legitimately run longer.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a new reqwest transport
    pub fn new(connect_timeout: Duration) -> GenAiResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(10)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| GenAiError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    /// Create a new reqwest transport with custom client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build_request(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, url).headers(headers);
        if let Some(body_data) = body {
            request = request.body(body_data);
        }
        request
    }
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

/// Map a non-success status and its body to an error.
pub fn map_http_error(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> GenAiError {
    let (message, code) = match serde_json::from_slice::<ApiErrorResponse>(body) {
        Ok(error_response) => (error_response.message, error_response.code),
        Err(_) => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            let message = if text.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            } else {
                text
            };
            (message, None)
        }
    };

    match GenAiError::from_status(status.as_u16(), message) {
        GenAiError::RateLimit { message, .. } => GenAiError::RateLimit {
            message,
            retry_after: parse_retry_after(headers),
        },
        GenAiError::Api {
            status, message, ..
        } => GenAiError::Api {
            status,
            message,
            code,
        },
        other => other,
    }
}

/// Parse a `Retry-After` header given in seconds.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(http::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// A body read that fails before the response is handed back is a dropped
/// connection, not a stream failure.
fn body_read_error(err: reqwest::Error) -> GenAiError {
    if err.is_timeout() {
        GenAiError::network(format!("Response body timed out: {}", err), "ETIMEDOUT")
    } else {
        GenAiError::network(format!("Failed to read response body: {}", err), "ECONNRESET")
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> GenAiResult<TransportResponse> {
        let response = self.build_request(method, url, headers, body).send().await?;

        let status = response.status();
        let response_headers = response.headers().clone();
        let body_bytes = response.bytes().await.map_err(body_read_error)?;

        if !status.is_success() {
            return Err(map_http_error(status, &response_headers, &body_bytes));
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            headers: response_headers,
            body: body_bytes,
        })
    }

    async fn send_streaming(
        &self,
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> GenAiResult<StreamingResponse> {
        let response = self.build_request(method, url, headers, body).send().await?;

        let status = response.status();
        let response_headers = response.headers().clone();

        if !status.is_success() {
            let body = response.bytes().await.map_err(body_read_error)?;
            return Err(map_http_error(status, &response_headers, &body));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(StreamingResponse {
                status: status.as_u16(),
                headers: response_headers,
                body: None,
            });
        }

        let stream: ByteStream = Box::pin(response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| GenAiError::StreamError {
                message: format!("Failed to read stream: {}", e),
            })
        }));

        Ok(StreamingResponse {
            status: status.as_u16(),
            headers: response_headers,
            body: Some(stream),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reqwest_transport_creation() {
        let transport = ReqwestTransport::new(Duration::from_secs(10));
        assert!(transport.is_ok());
    }

    #[test]
    fn test_map_http_error_uses_service_body() {
        let body = br#"{"code":"NotAuthorizedOrNotFound","message":"Authorization failed or requested resource not found."}"#;
        let err = map_http_error(StatusCode::NOT_FOUND, &HeaderMap::new(), body);

        match err {
            GenAiError::NotFound { message } => {
                assert_eq!(message, "Authorization failed or requested resource not found.")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_map_http_error_rate_limit_reads_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::RETRY_AFTER, "2".parse().unwrap());

        let err = map_http_error(StatusCode::TOO_MANY_REQUESTS, &headers, b"");
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_map_http_error_plain_text_and_unknown_status() {
        let err = map_http_error(StatusCode::CONFLICT, &HeaderMap::new(), b"busy");
        match err {
            GenAiError::Api {
                status, message, ..
            } => {
                assert_eq!(status, 409);
                assert_eq!(message, "busy");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = map_http_error(StatusCode::SERVICE_UNAVAILABLE, &HeaderMap::new(), b"");
        assert_eq!(err.status_code(), Some(503));
        assert!(err.to_string().contains("Service Unavailable"));
    }

    #[test]
    fn test_parse_retry_after_ignores_dates() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::RETRY_AFTER,
            "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap(),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }
}
