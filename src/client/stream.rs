//! Caller-facing chat stream.

use crate::errors::ApiCallError;
use crate::streaming::{CollectedText, PartStream};
use crate::types::StreamPart;
use futures::stream::Stream;
use http::HeaderMap;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Stream of parts for one chat call, with errors in the caller surface.
#[derive(Debug)]
pub struct ChatStream {
    parts: PartStream,
    headers: HeaderMap,
}

impl ChatStream {
    pub(crate) fn new(parts: PartStream, headers: HeaderMap) -> Self {
        Self { parts, headers }
    }

    /// Headers of the response that opened the stream
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of the `opc-request-id` header, if present
    pub fn request_id(&self) -> Option<&str> {
        self.headers
            .get("opc-request-id")
            .and_then(|v| v.to_str().ok())
    }

    /// Drain the stream into text, reasoning, tool calls and the finish part.
    pub async fn collect_text(self) -> Result<CollectedText, ApiCallError> {
        self.parts.collect_text().await.map_err(ApiCallError::from)
    }

    /// The underlying part stream
    pub fn into_inner(self) -> PartStream {
        self.parts
    }
}

impl Stream for ChatStream {
    type Item = Result<StreamPart, ApiCallError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.parts)
            .poll_next(cx)
            .map(|item| item.map(|result| result.map_err(ApiCallError::from)))
    }
}
