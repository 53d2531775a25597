//! Error categories, validation details and remediation hints.

use serde::{Deserialize, Serialize};

/// Detailed information about a validation failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationDetail {
    /// The field that failed validation
    pub field: String,
    /// The error message for this field
    pub message: String,
}

impl ValidationDetail {
    /// Create a new validation detail
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error category for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Client configuration errors
    Configuration,
    /// Authentication and authorization failures
    Authentication,
    /// Request validation errors
    Validation,
    /// Rate limiting
    RateLimit,
    /// Network connectivity issues
    Network,
    /// Operation exceeded its time budget
    Timeout,
    /// Server-side errors
    Server,
    /// Resource not found
    NotFound,
    /// Failures after the stream was opened
    Streaming,
    /// Internal library errors
    Internal,
}

impl ErrorCategory {
    /// Check if errors in this category are transient
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Server
                | ErrorCategory::Timeout
        )
    }

    /// Get a human-readable description of this category
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "Configuration error",
            ErrorCategory::Authentication => "Authentication error",
            ErrorCategory::Validation => "Validation error",
            ErrorCategory::RateLimit => "Rate limit exceeded",
            ErrorCategory::Network => "Network error",
            ErrorCategory::Timeout => "Timeout",
            ErrorCategory::Server => "Server error",
            ErrorCategory::NotFound => "Resource not found",
            ErrorCategory::Streaming => "Streaming error",
            ErrorCategory::Internal => "Internal error",
        }
    }

    /// Short label used as a metrics dimension
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Validation => "validation",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Network => "network",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Server => "server",
            ErrorCategory::NotFound => "not_found",
            ErrorCategory::Streaming => "streaming",
            ErrorCategory::Internal => "internal",
        }
    }
}

/// Remediation hint appended to surfaced errors, keyed by HTTP status.
pub fn remediation_hint(status_code: u16) -> Option<&'static str> {
    match status_code {
        401 => Some("Check OCI authentication configuration."),
        403 => Some("Check IAM policies and compartment access."),
        404 => Some("Check model ID and regional availability."),
        429 => Some("Rate limit exceeded. Implement retry with backoff."),
        _ => None,
    }
}

/// Error body returned by the service for non-success responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error message
    pub message: String,
    /// Error code (optional)
    #[serde(default)]
    pub code: Option<String>,
}
