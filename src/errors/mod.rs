//! Error types for the OCI Generative AI client.
//!
//! `GenAiError` is the internal taxonomy; `ApiCallError` is the uniform
//! surface handed to callers.

mod categories;
mod error;

pub use categories::{remediation_hint, ApiErrorResponse, ErrorCategory, ValidationDetail};
pub use error::{ApiCallError, GenAiError, GenAiResult};
