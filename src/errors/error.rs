//! Error types for the OCI Generative AI client.

use crate::errors::categories::{remediation_hint, ErrorCategory, ValidationDetail};
use crate::resilience::{ErrorSignal, TimeoutError};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for OCI Generative AI operations
pub type GenAiResult<T> = Result<T, GenAiError>;

/// Main error type for the OCI Generative AI client.
///
/// Every failure produced by the transport, the resilience layer or the
/// streaming pipeline is one of these variants. Malformed chunk payloads are
/// the exception: the interpreter drops them without producing an error.
#[derive(Error, Debug, Clone)]
pub enum GenAiError {
    /// Configuration error (invalid settings, unreadable response body)
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Authentication error (401)
    #[error("Authentication error: {message}")]
    Authentication {
        /// Error message describing the authentication issue
        message: String,
    },

    /// Authorization error (403)
    #[error("Authorization error: {message}")]
    Authorization {
        /// Error message describing the authorization issue
        message: String,
    },

    /// Validation error (invalid request parameters, 400)
    #[error("Validation error: {message}")]
    Validation {
        /// Error message describing the validation issue
        message: String,
        /// List of specific validation failures
        details: Vec<ValidationDetail>,
    },

    /// Rate limit error (429)
    #[error("Rate limit error: {message}")]
    RateLimit {
        /// Error message describing the rate limit issue
        message: String,
        /// Duration to wait before retrying (if provided by the service)
        retry_after: Option<Duration>,
    },

    /// Network error (connection reset, DNS failure, refused connection)
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
        /// Transport-level error code such as `ECONNRESET`
        code: Option<String>,
    },

    /// The operation did not complete within its time budget
    #[error("{operation} timed out after {}ms", timeout.as_millis())]
    Timeout {
        /// The time budget that elapsed
        timeout: Duration,
        /// Name of the operation that timed out
        operation: String,
    },

    /// Server error (5xx)
    #[error("Server error: {message}")]
    Server {
        /// Error message from the server
        message: String,
        /// HTTP status code
        status_code: Option<u16>,
    },

    /// Resource not found (404)
    #[error("Not found: {message}")]
    NotFound {
        /// Error message
        message: String,
    },

    /// Failure after the stream was opened (body read failure, interruption)
    #[error("Stream error: {message}")]
    StreamError {
        /// Error message describing the stream issue
        message: String,
    },

    /// Any other non-success HTTP status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
        /// Service error code, when the body carried one
        code: Option<String>,
    },

    /// Internal error (unexpected conditions, library bugs)
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal issue
        message: String,
    },
}

impl GenAiError {
    /// Build a network error carrying a transport code.
    pub fn network(message: impl Into<String>, code: impl Into<String>) -> Self {
        GenAiError::Network {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    /// Build the error for a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            400 => GenAiError::Validation {
                message,
                details: vec![],
            },
            401 => GenAiError::Authentication { message },
            403 => GenAiError::Authorization { message },
            404 => GenAiError::NotFound { message },
            429 => GenAiError::RateLimit {
                message,
                retry_after: None,
            },
            500..=599 => GenAiError::Server {
                message,
                status_code: Some(status),
            },
            _ => GenAiError::Api {
                status,
                message,
                code: None,
            },
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            GenAiError::Validation { .. } => Some(400),
            GenAiError::Authentication { .. } => Some(401),
            GenAiError::Authorization { .. } => Some(403),
            GenAiError::NotFound { .. } => Some(404),
            GenAiError::RateLimit { .. } => Some(429),
            GenAiError::Server { status_code, .. } => *status_code,
            GenAiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Transport-level code, when the failure carries one.
    pub fn transport_code(&self) -> Option<&str> {
        match self {
            GenAiError::Network { code, .. } => code.as_deref(),
            GenAiError::Timeout { .. } => Some("ETIMEDOUT"),
            _ => None,
        }
    }

    /// The minimal view consulted by retry predicates.
    pub fn error_signal(&self) -> ErrorSignal {
        ErrorSignal {
            status_code: self.status_code(),
            transport_code: self.transport_code().map(str::to_string),
        }
    }

    /// Returns true if the default retry policy would retry this error.
    pub fn is_retryable(&self) -> bool {
        crate::resilience::default_is_retryable(&self.error_signal())
    }

    /// Returns the retry-after duration if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GenAiError::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Error category for classification and handling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            GenAiError::Configuration { .. } => ErrorCategory::Configuration,
            GenAiError::Authentication { .. } | GenAiError::Authorization { .. } => {
                ErrorCategory::Authentication
            }
            GenAiError::Validation { .. } => ErrorCategory::Validation,
            GenAiError::RateLimit { .. } => ErrorCategory::RateLimit,
            GenAiError::Network { .. } => ErrorCategory::Network,
            GenAiError::Timeout { .. } => ErrorCategory::Timeout,
            GenAiError::Server { .. } => ErrorCategory::Server,
            GenAiError::NotFound { .. } => ErrorCategory::NotFound,
            GenAiError::StreamError { .. } => ErrorCategory::Streaming,
            GenAiError::Api { status, .. } if *status >= 500 => ErrorCategory::Server,
            GenAiError::Api { .. } => ErrorCategory::Validation,
            GenAiError::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

impl From<TimeoutError> for GenAiError {
    fn from(err: TimeoutError) -> Self {
        GenAiError::Timeout {
            timeout: err.timeout,
            operation: err.operation,
        }
    }
}

impl From<reqwest::Error> for GenAiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            GenAiError::Configuration {
                message: format!("Invalid request: {}", err),
            }
        } else if err.is_redirect() {
            GenAiError::Internal {
                message: format!("Redirect failed: {}", err),
            }
        } else if err.is_timeout() {
            GenAiError::network(format!("Request timed out: {}", err), "ETIMEDOUT")
        } else if err.is_connect() {
            GenAiError::network(format!("Connection failed: {}", err), "ECONNREFUSED")
        } else if err.is_body() || err.is_decode() {
            GenAiError::StreamError {
                message: format!("Failed to read response body: {}", err),
            }
        } else {
            GenAiError::network(format!("Network error: {}", err), "ECONNRESET")
        }
    }
}

impl From<serde_json::Error> for GenAiError {
    fn from(err: serde_json::Error) -> Self {
        GenAiError::Internal {
            message: format!("JSON serialization/deserialization error: {}", err),
        }
    }
}

impl From<url::ParseError> for GenAiError {
    fn from(err: url::ParseError) -> Self {
        GenAiError::Configuration {
            message: format!("Invalid URL: {}", err),
        }
    }
}

/// The uniform error surfaced to callers of the client.
///
/// Carries the message (with a remediation hint appended when the status
/// code has one), the status code when known, and whether the failure was
/// classified as transient.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ApiCallError {
    /// Human-readable message, including the remediation hint
    pub message: String,
    /// HTTP status code, when the failure came from a response
    pub status_code: Option<u16>,
    /// Whether the failure was classified as transient
    pub retryable: bool,
    /// Category of the underlying failure
    pub category: ErrorCategory,
    /// The failure this surface was built from
    #[source]
    pub cause: Box<GenAiError>,
}

impl From<GenAiError> for ApiCallError {
    fn from(err: GenAiError) -> Self {
        let status_code = err.status_code();
        let mut message = err.to_string();
        if let Some(hint) = status_code.and_then(remediation_hint) {
            message.push('\n');
            message.push_str(hint);
        }

        Self {
            message,
            status_code,
            retryable: err.is_retryable(),
            category: err.category(),
            cause: Box::new(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_retryable() {
        let rate_limit_error = GenAiError::RateLimit {
            message: "Too many requests".to_string(),
            retry_after: Some(Duration::from_secs(30)),
        };
        assert!(rate_limit_error.is_retryable());

        let auth_error = GenAiError::Authentication {
            message: "Invalid signature".to_string(),
        };
        assert!(!auth_error.is_retryable());

        let server_error = GenAiError::Server {
            message: "Service unavailable".to_string(),
            status_code: Some(503),
        };
        assert!(server_error.is_retryable());

        let reset = GenAiError::network("socket hang up", "ECONNRESET");
        assert!(reset.is_retryable());

        let timeout = GenAiError::from(TimeoutError::new(Duration::from_millis(50), "chat"));
        assert!(timeout.is_retryable());
    }

    #[test]
    fn test_from_status() {
        assert!(matches!(
            GenAiError::from_status(400, "bad"),
            GenAiError::Validation { .. }
        ));
        assert!(matches!(
            GenAiError::from_status(403, "denied"),
            GenAiError::Authorization { .. }
        ));
        assert!(matches!(
            GenAiError::from_status(502, "bad gateway"),
            GenAiError::Server {
                status_code: Some(502),
                ..
            }
        ));
        assert_eq!(GenAiError::from_status(409, "conflict").status_code(), Some(409));
        assert!(!GenAiError::from_status(409, "conflict").is_retryable());
    }

    #[test]
    fn test_timeout_message() {
        let err = GenAiError::from(TimeoutError::new(Duration::from_millis(250), "OCI chat request"));
        assert_eq!(err.to_string(), "OCI chat request timed out after 250ms");
        assert_eq!(err.category(), ErrorCategory::Timeout);
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_api_call_error_appends_hint() {
        let surfaced = ApiCallError::from(GenAiError::from_status(401, "signature mismatch"));
        assert_eq!(surfaced.status_code, Some(401));
        assert!(!surfaced.retryable);
        assert!(surfaced.message.contains("signature mismatch"));
        assert!(surfaced.message.ends_with("Check OCI authentication configuration."));

        let surfaced = ApiCallError::from(GenAiError::from_status(429, "slow down"));
        assert!(surfaced.retryable);
        assert!(surfaced.message.contains("backoff"));
    }

    #[test]
    fn test_api_call_error_without_status_has_no_hint() {
        let surfaced = ApiCallError::from(GenAiError::StreamError {
            message: "connection dropped".to_string(),
        });
        assert_eq!(surfaced.status_code, None);
        assert_eq!(surfaced.message, "Stream error: connection dropped");
        assert_eq!(surfaced.category, ErrorCategory::Streaming);
    }

    #[test]
    fn test_reqwest_builder_error_is_not_retried() {
        let err = reqwest::Client::new()
            .get("not a url")
            .build()
            .expect_err("relative url is rejected");
        assert!(err.is_builder());

        let err = GenAiError::from(err);
        assert!(matches!(err, GenAiError::Configuration { .. }));
        assert_eq!(err.error_signal().transport_code, None);
        assert!(!err.is_retryable());
    }
}
