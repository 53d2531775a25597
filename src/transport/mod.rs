//! HTTP transport layer and SSE framing.

mod http_transport;
mod sse;

pub use http_transport::{
    map_http_error, parse_retry_after, ByteStream, HttpTransport, ReqwestTransport,
    StreamingResponse, TransportResponse,
};
pub use sse::{SseEvent, SseParser, SseStream, DEFAULT_EVENT_TYPE, DONE_SENTINEL};
