//! Retry arithmetic, short-circuiting and timeout behavior.

use integrations_oci_genai::errors::GenAiError;
use integrations_oci_genai::resilience::{
    AsErrorSignal, ErrorSignal, ResilienceConfig, ResilienceExecutor, RetryExecutor, RetryPolicy,
    TimeoutError,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

/// An error type unrelated to the crate's own, classified only through
/// its signal.
#[derive(Debug, Clone, PartialEq)]
enum UpstreamFailure {
    Status(u16),
    Transport(&'static str),
    TimedOut,
}

impl AsErrorSignal for UpstreamFailure {
    fn error_signal(&self) -> ErrorSignal {
        match self {
            UpstreamFailure::Status(code) => ErrorSignal::status(*code),
            UpstreamFailure::Transport(code) => ErrorSignal::transport(*code),
            UpstreamFailure::TimedOut => ErrorSignal::transport("ETIMEDOUT"),
        }
    }
}

impl From<TimeoutError> for UpstreamFailure {
    fn from(_: TimeoutError) -> Self {
        UpstreamFailure::TimedOut
    }
}

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy::default()
        .with_max_retries(max_retries)
        .with_base_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_millis(10_000))
}

async fn fail_then_succeed(
    executor: &RetryExecutor,
    failures: u32,
    failure: UpstreamFailure,
) -> (Result<&'static str, UpstreamFailure>, u32) {
    let calls = Arc::new(AtomicU32::new(0));
    let result = executor
        .execute(|| {
            let calls = calls.clone();
            let failure = failure.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < failures {
                    Err(failure)
                } else {
                    Ok("done")
                }
            }
        })
        .await;
    (result, calls.load(Ordering::SeqCst))
}

#[test_case(0, 0 ; "no failures")]
#[test_case(1, 3 ; "one failure")]
#[test_case(3, 3 ; "failures equal to budget")]
#[test_case(2, 5 ; "failures below budget")]
#[tokio::test(start_paused = true)]
async fn test_retry_arithmetic(failures: u32, max_retries: u32) {
    let executor = RetryExecutor::new(policy(max_retries));
    let (result, calls) = fail_then_succeed(&executor, failures, UpstreamFailure::Status(503)).await;

    assert_eq!(assert_ok!(result), "done");
    assert_eq!(calls, failures + 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_surfaces_last_error() {
    let executor = RetryExecutor::new(policy(2));
    let (result, calls) =
        fail_then_succeed(&executor, 10, UpstreamFailure::Transport("ECONNRESET")).await;

    assert_eq!(assert_err!(result), UpstreamFailure::Transport("ECONNRESET"));
    assert_eq!(calls, 3);
}

#[test_case(400)]
#[test_case(401)]
#[test_case(403)]
#[test_case(404)]
#[tokio::test(start_paused = true)]
async fn test_non_retryable_short_circuit(status: u16) {
    let executor = RetryExecutor::new(policy(5));
    let (result, calls) = fail_then_succeed(&executor, u32::MAX, UpstreamFailure::Status(status)).await;

    assert_eq!(assert_err!(result), UpstreamFailure::Status(status));
    assert_eq!(calls, 1);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_retry_makes_one_attempt() {
    let mut retry = policy(5);
    retry.enabled = false;
    let disabled = RetryExecutor::new(retry);
    let (result, calls) = fail_then_succeed(&disabled, u32::MAX, UpstreamFailure::Status(503)).await;

    assert!(result.is_err());
    assert_eq!(calls, 1);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_waits_double_each_time() {
    let executor = RetryExecutor::new(policy(3));
    let started = Instant::now();
    let (result, _) = fail_then_succeed(&executor, 3, UpstreamFailure::Status(500)).await;

    assert!(result.is_ok());
    // 100 + 200 + 400
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(700), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(750), "elapsed {:?}", elapsed);
}

#[test_case(0, 100)]
#[test_case(1, 200)]
#[test_case(4, 1600)]
#[test_case(7, 10_000)]
#[test_case(40, 10_000)]
fn test_delay_formula(attempt: u32, expected_ms: u64) {
    assert_eq!(
        policy(3).calculate_delay(attempt),
        Duration::from_millis(expected_ms)
    );
}

#[tokio::test(start_paused = true)]
async fn test_timeout_without_retry() {
    let executor = ResilienceExecutor::new(
        ResilienceConfig::default()
            .with_timeout(Duration::from_millis(250))
            .with_retry(RetryPolicy::disabled()),
    );
    let calls = Arc::new(AtomicU32::new(0));
    let started = Instant::now();

    let result: Result<(), UpstreamFailure> = executor
        .execute("slow call", || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }
        })
        .await;

    assert_eq!(result, Err(UpstreamFailure::TimedOut));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(250), "elapsed {:?}", elapsed);
    assert!(elapsed < Duration::from_millis(300), "elapsed {:?}", elapsed);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_a_crate_timeout_error() {
    let executor = ResilienceExecutor::new(
        ResilienceConfig::default()
            .with_timeout(Duration::from_millis(10))
            .with_retry(RetryPolicy::disabled()),
    );

    let err = executor
        .execute("OCI streaming chat request", || async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<(), GenAiError>(())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, GenAiError::Timeout { .. }));
    assert!(err.is_retryable());
    assert_eq!(err.to_string(), "OCI streaming chat request timed out after 10ms");
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_hint_overrides_backoff() {
    let executor = RetryExecutor::new(policy(1).with_max_delay(Duration::from_secs(2)));
    let calls = Arc::new(AtomicU32::new(0));
    let started = Instant::now();

    let result = executor
        .execute(|| {
            let calls = calls.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(GenAiError::RateLimit {
                        message: "slow down".to_string(),
                        retry_after: Some(Duration::from_secs(30)),
                    })
                } else {
                    Ok(())
                }
            }
        })
        .await;

    assert!(result.is_ok());
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_millis(2050));
}

#[tokio::test(start_paused = true)]
async fn test_executor_keeps_no_state_between_calls() {
    let executor = RetryExecutor::new(policy(1));

    for _ in 0..3 {
        let (result, calls) = fail_then_succeed(&executor, 1, UpstreamFailure::Status(429)).await;
        assert!(result.is_ok());
        assert_eq!(calls, 2);
    }
}
