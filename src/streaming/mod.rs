//! Streaming pipeline: chunk interpretation, finish/usage aggregation and
//! assembly of the consumer-facing part stream.
//!
//! Framing lives in [`crate::transport`]; this module starts from event
//! payloads.

mod aggregator;
mod dialects;
mod interpreter;
mod stream;

pub use aggregator::FinishAggregator;
pub use interpreter::{
    ChunkInterpreter, ChunkSummary, Interpretation, ToolCallIdGenerator, UsageUpdate,
};
pub use stream::{CollectedText, PartStream};
