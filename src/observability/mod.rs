//! Observability: structured logging setup and metrics.

mod logging;
mod metrics;

pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
pub use metrics::{
    Counter, InMemoryMetricsCollector, MetricsCollector, MetricsSnapshot, NoopMetricsCollector,
};
