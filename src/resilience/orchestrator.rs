//! Timeout plus retry around connection-establishing calls.

use super::retry::{AsErrorSignal, RetryExecutor, RetryPolicy};
use super::timeout::{with_timeout, TimeoutError};
use crate::config::ResolvedRequestOptions;
use std::future::Future;
use std::time::Duration;

/// Configuration for the resilience executor
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    /// Time budget for each attempt
    pub timeout: Duration,
    /// Retry policy across attempts
    pub retry: RetryPolicy,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self::from(&ResolvedRequestOptions::default())
    }
}

impl From<&ResolvedRequestOptions> for ResilienceConfig {
    fn from(options: &ResolvedRequestOptions) -> Self {
        Self {
            timeout: Duration::from_millis(options.timeout_ms),
            retry: RetryPolicy::from_settings(&options.retry),
        }
    }
}

impl ResilienceConfig {
    /// Set the per-attempt timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Runs an operation under a per-attempt timeout and, when enabled, retries
/// transient failures with exponential backoff.
///
/// Only wrap the call that establishes a response or opens a stream. Reading
/// an already-open stream must never go through here: a retry would replay
/// output the caller has already seen.
#[derive(Debug, Clone)]
pub struct ResilienceExecutor {
    timeout: Duration,
    retry: RetryExecutor,
}

impl Default for ResilienceExecutor {
    fn default() -> Self {
        Self::new(ResilienceConfig::default())
    }
}

impl ResilienceExecutor {
    /// Create an executor from its configuration
    pub fn new(config: ResilienceConfig) -> Self {
        Self {
            timeout: config.timeout,
            retry: RetryExecutor::new(config.retry),
        }
    }

    /// Create an executor from resolved request options
    pub fn from_options(options: &ResolvedRequestOptions) -> Self {
        Self::new(ResilienceConfig::from(options))
    }

    /// The per-attempt timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The retry policy
    pub fn retry_policy(&self) -> &RetryPolicy {
        self.retry.policy()
    }

    /// Execute `operation`, each attempt racing the timeout.
    pub async fn execute<F, Fut, T, E>(&self, operation_name: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: AsErrorSignal + From<TimeoutError>,
    {
        let timeout = self.timeout;
        self.retry
            .execute(|| with_timeout(operation(), timeout, operation_name))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_request_options, RequestOptions, RetryOptions};
    use crate::errors::GenAiError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_config_from_resolved_options() {
        let resolved = resolve_request_options(
            None,
            Some(&RequestOptions {
                timeout_ms: Some(5000),
                retry: Some(RetryOptions {
                    max_retries: Some(1),
                    ..Default::default()
                }),
            }),
        )
        .unwrap();

        let executor = ResilienceExecutor::from_options(&resolved);
        assert_eq!(executor.timeout(), Duration::from_secs(5));
        assert_eq!(executor.retry_policy().max_retries, 1);
        assert_eq!(executor.retry_policy().base_delay, Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_attempts_are_retried() {
        let executor = ResilienceExecutor::new(
            ResilienceConfig::default()
                .with_timeout(Duration::from_millis(50))
                .with_retry(RetryPolicy::default().with_max_retries(2)),
        );
        let calls = AtomicU32::new(0);

        let result: Result<&str, GenAiError> = executor
            .execute("slow then fast", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        tokio::time::sleep(Duration::from_secs(10)).await;
                    }
                    Ok("connected")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "connected");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
