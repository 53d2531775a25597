//! Retry logic with exponential backoff.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RetrySettings;

/// Transport codes treated as transient by the default predicate.
pub const TRANSIENT_TRANSPORT_CODES: &[&str] = &[
    "ECONNRESET",
    "ETIMEDOUT",
    "ENOTFOUND",
    "ECONNREFUSED",
    "EAI_AGAIN",
];

/// The minimal view of a failure that retry predicates need.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSignal {
    /// HTTP status code, when the failure came from a response
    pub status_code: Option<u16>,
    /// Transport-level code such as `ECONNRESET`
    pub transport_code: Option<String>,
}

impl ErrorSignal {
    /// Signal for an HTTP status
    pub fn status(status_code: u16) -> Self {
        Self {
            status_code: Some(status_code),
            transport_code: None,
        }
    }

    /// Signal for a transport failure
    pub fn transport(code: impl Into<String>) -> Self {
        Self {
            status_code: None,
            transport_code: Some(code.into()),
        }
    }
}

/// Anything a retry loop can classify.
///
/// Implemented by the crate's error type; any other error type only has to
/// expose an [`ErrorSignal`] to be retried.
pub trait AsErrorSignal {
    /// Project this failure onto an [`ErrorSignal`].
    fn error_signal(&self) -> ErrorSignal;

    /// Server-provided delay before the next attempt, if any.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl AsErrorSignal for ErrorSignal {
    fn error_signal(&self) -> ErrorSignal {
        self.clone()
    }
}

impl AsErrorSignal for crate::errors::GenAiError {
    fn error_signal(&self) -> ErrorSignal {
        crate::errors::GenAiError::error_signal(self)
    }

    fn retry_after(&self) -> Option<Duration> {
        crate::errors::GenAiError::retry_after(self)
    }
}

/// Default retryability: 429 and 5xx, or a known transient transport code.
///
/// Any other 4xx is final even when a transport code is present.
pub fn default_is_retryable(signal: &ErrorSignal) -> bool {
    if let Some(status) = signal.status_code {
        if status == 429 || status >= 500 {
            return true;
        }
        if (400..500).contains(&status) {
            return false;
        }
    }

    signal
        .transport_code
        .as_deref()
        .is_some_and(|code| TRANSIENT_TRANSPORT_CODES.contains(&code))
}

/// Pluggable retryability predicate
pub type RetryPredicate = Arc<dyn Fn(&ErrorSignal) -> bool + Send + Sync>;

/// Retry policy for one call.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Whether failed attempts are retried at all
    pub enabled: bool,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Jitter factor (0.0 to 1.0) applied symmetrically around the delay
    pub jitter: f64,
    is_retryable: RetryPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("enabled", &self.enabled)
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("jitter", &self.jitter)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Build a policy from resolved settings, using the default predicate
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            enabled: settings.enabled,
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            jitter: 0.0,
            is_retryable: Arc::new(default_is_retryable),
        }
    }

    /// A policy that makes exactly one attempt
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Set the maximum number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the jitter factor
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Replace the retryability predicate
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&ErrorSignal) -> bool + Send + Sync + 'static,
    {
        self.is_retryable = Arc::new(predicate);
        self
    }

    /// Consult the predicate
    pub fn is_retryable(&self, signal: &ErrorSignal) -> bool {
        (self.is_retryable)(signal)
    }

    /// Total attempts this policy allows
    pub fn max_attempts(&self) -> u32 {
        if self.enabled {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }

    /// Delay after the failed attempt `attempt` (0-indexed):
    /// `min(base * 2^attempt, max)`, then jittered and clamped again.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let factor = 2f64.powi(attempt.min(63) as i32);
        let base_ms = self.base_delay.as_millis() as f64 * factor;
        let max_ms = self.max_delay.as_millis() as f64;
        let delay_ms = base_ms.min(max_ms);

        let jitter_range = delay_ms * self.jitter;
        let jitter_offset = if jitter_range > 0.0 {
            rand::random::<f64>() * jitter_range * 2.0 - jitter_range
        } else {
            0.0
        };
        let final_delay_ms = (delay_ms + jitter_offset).clamp(0.0, max_ms);

        Duration::from_millis(final_delay_ms as u64)
    }
}

/// Executor for retry operations.
///
/// Holds no state between calls; attempt counters live inside `execute`.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create a new retry executor with a policy
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// The policy in use
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation, retrying transient failures per the policy.
    ///
    /// Returns the first success, the first non-retryable failure, or the
    /// failure of the last allowed attempt.
    pub async fn execute<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: AsErrorSignal,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            tracing::debug!(attempt = attempt + 1, max_attempts, "Starting attempt");

            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let signal = error.error_signal();
            if !self.policy.enabled || !self.policy.is_retryable(&signal) {
                tracing::debug!(
                    attempt = attempt + 1,
                    status = ?signal.status_code,
                    code = ?signal.transport_code,
                    "Attempt failed with a non-retryable error"
                );
                return Err(error);
            }

            if attempt + 1 >= max_attempts {
                tracing::warn!(
                    attempts = attempt + 1,
                    status = ?signal.status_code,
                    code = ?signal.transport_code,
                    "Retries exhausted"
                );
                return Err(error);
            }

            let delay = error
                .retry_after()
                .map(|hint| hint.min(self.policy.max_delay))
                .unwrap_or_else(|| self.policy.calculate_delay(attempt));

            tracing::warn!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                status = ?signal.status_code,
                code = ?signal.transport_code,
                "Retrying after transient failure"
            );

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
