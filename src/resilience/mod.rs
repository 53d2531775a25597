//! Resilience patterns for connection-establishing calls.
//!
//! This module provides:
//! - A per-attempt timeout race
//! - Retry with exponential backoff driven by a pluggable predicate
//! - An executor combining both

mod orchestrator;
mod retry;
mod timeout;

pub use orchestrator::{ResilienceConfig, ResilienceExecutor};
pub use retry::{
    default_is_retryable, AsErrorSignal, ErrorSignal, RetryExecutor, RetryPolicy, RetryPredicate,
    TRANSIENT_TRANSPORT_CODES,
};
pub use timeout::{with_timeout, TimeoutError};
