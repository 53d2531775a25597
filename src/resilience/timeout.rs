//! Time budget for a single attempt.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// An operation exceeded its time budget.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} timed out after {}ms", timeout.as_millis())]
pub struct TimeoutError {
    /// The time budget that elapsed
    pub timeout: Duration,
    /// Name of the operation
    pub operation: String,
}

impl TimeoutError {
    /// Create a timeout error for a named operation
    pub fn new(timeout: Duration, operation: impl Into<String>) -> Self {
        Self {
            timeout,
            operation: operation.into(),
        }
    }
}

/// Race `future` against a timer of `timeout`.
///
/// On expiry the future is dropped and a timeout-kind error is returned.
/// Dropping only stops this side from waiting: work the future already
/// handed off (a request in flight on a pooled connection, server-side
/// generation) is not guaranteed to stop.
pub async fn with_timeout<F, T, E>(future: F, timeout: Duration, operation: &str) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<TimeoutError>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                operation,
                timeout_ms = timeout.as_millis() as u64,
                "Operation timed out"
            );
            Err(E::from(TimeoutError::new(timeout, operation)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GenAiError;

    #[tokio::test(start_paused = true)]
    async fn test_completes_within_budget() {
        let result: Result<u32, GenAiError> = with_timeout(
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(7)
            },
            Duration::from_millis(100),
            "fast op",
        )
        .await;

        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let start = tokio::time::Instant::now();
        let result: Result<u32, GenAiError> = with_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(7)
            },
            Duration::from_millis(100),
            "slow op",
        )
        .await;

        match result {
            Err(GenAiError::Timeout { timeout, operation }) => {
                assert_eq!(timeout, Duration::from_millis(100));
                assert_eq!(operation, "slow op");
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inner_error_passes_through() {
        let result: Result<u32, GenAiError> = with_timeout(
            async { Err(GenAiError::from_status(404, "no such model")) },
            Duration::from_millis(100),
            "lookup",
        )
        .await;

        assert!(matches!(result, Err(GenAiError::NotFound { .. })));
    }

    #[test]
    fn test_timeout_error_display() {
        let err = TimeoutError::new(Duration::from_millis(30000), "OCI chat request");
        assert_eq!(err.to_string(), "OCI chat request timed out after 30000ms");
    }
}
