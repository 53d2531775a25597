//! Metrics collection for the OCI Generative AI client.

use crate::types::UsageSnapshot;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A counter metric
#[derive(Debug)]
pub struct Counter {
    name: String,
    value: AtomicU64,
}

impl Counter {
    /// Create a new counter
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AtomicU64::new(0),
        }
    }

    /// Increment the counter
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Add a value to the counter
    pub fn add(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    /// Get the current value
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Get the name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Trait for metrics collection.
///
/// Operations are keyed by name (`chat`, `chat_stream`); failures are
/// additionally keyed by error category.
pub trait MetricsCollector: Send + Sync {
    /// An attempt to establish a call started
    fn record_attempt(&self, operation: &str);

    /// A failed attempt is being retried
    fn record_retry(&self, operation: &str);

    /// An attempt exceeded its timeout
    fn record_timeout(&self, operation: &str);

    /// A call was established after `duration_ms`
    fn record_success(&self, operation: &str, duration_ms: u64);

    /// A call failed for good
    fn record_failure(&self, operation: &str, category: &str);

    /// Chunks dropped as malformed or unrecognized
    fn record_dropped_chunks(&self, count: u64);

    /// Token usage of a completed stream or response
    fn record_tokens(&self, usage: &UsageSnapshot);

    /// Get a snapshot of all metrics
    fn snapshot(&self) -> MetricsSnapshot;
}

/// A snapshot of metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Attempts by operation
    pub attempts: HashMap<String, u64>,
    /// Retries by operation
    pub retries: HashMap<String, u64>,
    /// Timed-out attempts by operation
    pub timeouts: HashMap<String, u64>,
    /// Established calls by operation
    pub successes: HashMap<String, u64>,
    /// Final failures by `operation.category`
    pub failures: HashMap<String, u64>,
    /// Average establishment latency by operation
    pub avg_latency_ms: HashMap<String, f64>,
    /// Dropped chunks
    pub dropped_chunks: u64,
    /// Total prompt tokens
    pub total_prompt_tokens: u64,
    /// Total completion tokens
    pub total_completion_tokens: u64,
}

type CounterMap = RwLock<HashMap<String, Arc<Counter>>>;

/// In-memory metrics collector
#[derive(Debug, Default)]
pub struct InMemoryMetricsCollector {
    attempts: CounterMap,
    retries: CounterMap,
    timeouts: CounterMap,
    successes: CounterMap,
    failures: CounterMap,
    latency_sum_ms: CounterMap,
    dropped_chunks: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl InMemoryMetricsCollector {
    /// Create a new in-memory metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_create_counter(map: &CounterMap, key: &str) -> Arc<Counter> {
        {
            let read = map.read();
            if let Some(counter) = read.get(key) {
                return counter.clone();
            }
        }

        let mut write = map.write();
        write
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Counter::new(key)))
            .clone()
    }

    fn collect(map: &CounterMap) -> HashMap<String, u64> {
        map.read()
            .iter()
            .map(|(key, counter)| (key.clone(), counter.get()))
            .collect()
    }
}

impl MetricsCollector for InMemoryMetricsCollector {
    fn record_attempt(&self, operation: &str) {
        Self::get_or_create_counter(&self.attempts, operation).inc();
    }

    fn record_retry(&self, operation: &str) {
        Self::get_or_create_counter(&self.retries, operation).inc();
    }

    fn record_timeout(&self, operation: &str) {
        Self::get_or_create_counter(&self.timeouts, operation).inc();
    }

    fn record_success(&self, operation: &str, duration_ms: u64) {
        Self::get_or_create_counter(&self.successes, operation).inc();
        Self::get_or_create_counter(&self.latency_sum_ms, operation).add(duration_ms);
    }

    fn record_failure(&self, operation: &str, category: &str) {
        let key = format!("{}.{}", operation, category);
        Self::get_or_create_counter(&self.failures, &key).inc();
    }

    fn record_dropped_chunks(&self, count: u64) {
        self.dropped_chunks.fetch_add(count, Ordering::Relaxed);
    }

    fn record_tokens(&self, usage: &UsageSnapshot) {
        self.prompt_tokens
            .fetch_add(usage.prompt_tokens, Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(usage.completion_tokens, Ordering::Relaxed);
    }

    fn snapshot(&self) -> MetricsSnapshot {
        let successes = Self::collect(&self.successes);
        let avg_latency_ms = Self::collect(&self.latency_sum_ms)
            .into_iter()
            .filter_map(|(operation, sum)| {
                let count = *successes.get(&operation)?;
                (count > 0).then(|| (operation, sum as f64 / count as f64))
            })
            .collect();

        MetricsSnapshot {
            attempts: Self::collect(&self.attempts),
            retries: Self::collect(&self.retries),
            timeouts: Self::collect(&self.timeouts),
            successes,
            failures: Self::collect(&self.failures),
            avg_latency_ms,
            dropped_chunks: self.dropped_chunks.load(Ordering::Relaxed),
            total_prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            total_completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
        }
    }
}

/// No-op metrics collector for testing or when metrics are disabled
#[derive(Debug, Default)]
pub struct NoopMetricsCollector;

impl MetricsCollector for NoopMetricsCollector {
    fn record_attempt(&self, _operation: &str) {}
    fn record_retry(&self, _operation: &str) {}
    fn record_timeout(&self, _operation: &str) {}
    fn record_success(&self, _operation: &str, _duration_ms: u64) {}
    fn record_failure(&self, _operation: &str, _category: &str) {}
    fn record_dropped_chunks(&self, _count: u64) {}
    fn record_tokens(&self, _usage: &UsageSnapshot) {}
    fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot::default()
    }
}
