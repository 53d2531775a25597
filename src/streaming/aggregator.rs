//! Finish/usage aggregator.
//!
//! Buffers the latest finish reason and usage counters seen across a stream
//! and builds the single terminal [`StreamPart::Finish`].

use super::interpreter::ChunkSummary;
use crate::types::{FinishReason, StreamPart, UsageSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AggregatorState {
    Accumulating,
    Finished,
}

/// Accumulates finish/usage fields for one stream.
///
/// Each field is last-write-wins; a chunk that omits a field leaves the
/// previously seen value in place.
#[derive(Debug, Clone)]
pub struct FinishAggregator {
    state: AggregatorState,
    finish_reason: Option<String>,
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    reasoning_tokens: Option<u64>,
    accepted_prediction_tokens: Option<u64>,
    rejected_prediction_tokens: Option<u64>,
}

impl FinishAggregator {
    /// Create an aggregator in the accumulating state.
    pub fn new() -> Self {
        Self {
            state: AggregatorState::Accumulating,
            finish_reason: None,
            prompt_tokens: None,
            completion_tokens: None,
            reasoning_tokens: None,
            accepted_prediction_tokens: None,
            rejected_prediction_tokens: None,
        }
    }

    /// Record the finish/usage fields of one chunk.
    ///
    /// Ignored once the aggregator has finished.
    pub fn observe(&mut self, summary: &ChunkSummary) {
        if self.state == AggregatorState::Finished {
            return;
        }

        if let Some(reason) = &summary.finish_reason {
            self.finish_reason = Some(reason.clone());
        }

        if let Some(usage) = &summary.usage {
            update(&mut self.prompt_tokens, usage.prompt_tokens);
            update(&mut self.completion_tokens, usage.completion_tokens);
            update(&mut self.reasoning_tokens, usage.reasoning_tokens);
            update(
                &mut self.accepted_prediction_tokens,
                usage.accepted_prediction_tokens,
            );
            update(
                &mut self.rejected_prediction_tokens,
                usage.rejected_prediction_tokens,
            );
        }
    }

    /// Whether the terminal part has been produced.
    pub fn is_finished(&self) -> bool {
        self.state == AggregatorState::Finished
    }

    /// Current usage, with unseen required counters at zero.
    pub fn usage(&self) -> UsageSnapshot {
        UsageSnapshot {
            prompt_tokens: self.prompt_tokens.unwrap_or(0),
            completion_tokens: self.completion_tokens.unwrap_or(0),
            reasoning_tokens: self.reasoning_tokens,
            accepted_prediction_tokens: self.accepted_prediction_tokens,
            rejected_prediction_tokens: self.rejected_prediction_tokens,
        }
    }

    /// Current finish reason, `STOP` when none was seen.
    pub fn reason(&self) -> FinishReason {
        self.finish_reason
            .as_deref()
            .map(FinishReason::from_raw)
            .unwrap_or_default()
    }

    /// Transition to finished and build the terminal part.
    ///
    /// Returns `Some` exactly once.
    pub fn finish(&mut self) -> Option<StreamPart> {
        if self.state == AggregatorState::Finished {
            return None;
        }
        self.state = AggregatorState::Finished;

        let part = StreamPart::Finish {
            reason: self.reason(),
            usage: self.usage(),
        };
        tracing::debug!(
            reason = self.finish_reason.as_deref().unwrap_or("STOP"),
            prompt_tokens = self.prompt_tokens.unwrap_or(0),
            completion_tokens = self.completion_tokens.unwrap_or(0),
            "Emitting finish part"
        );
        Some(part)
    }
}

impl Default for FinishAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn update(slot: &mut Option<u64>, value: Option<u64>) {
    if value.is_some() {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::interpreter::UsageUpdate;
    use crate::types::UnifiedReason;
    use pretty_assertions::assert_eq;

    fn reason(raw: &str) -> ChunkSummary {
        ChunkSummary {
            finish_reason: Some(raw.to_string()),
            usage: None,
        }
    }

    fn usage(update: UsageUpdate) -> ChunkSummary {
        ChunkSummary {
            finish_reason: None,
            usage: Some(update),
        }
    }

    #[test]
    fn test_defaults_when_nothing_observed() {
        let mut aggregator = FinishAggregator::new();
        let part = aggregator.finish().unwrap();

        assert_eq!(
            part,
            StreamPart::Finish {
                reason: FinishReason::from_raw("STOP"),
                usage: UsageSnapshot::new(0, 0),
            }
        );
    }

    #[test]
    fn test_finish_only_once() {
        let mut aggregator = FinishAggregator::new();
        assert!(aggregator.finish().is_some());
        assert!(aggregator.is_finished());
        assert!(aggregator.finish().is_none());
    }

    #[test]
    fn test_last_write_wins_per_field() {
        let mut aggregator = FinishAggregator::new();
        aggregator.observe(&usage(UsageUpdate {
            prompt_tokens: Some(10),
            completion_tokens: Some(1),
            reasoning_tokens: Some(4),
            ..Default::default()
        }));
        aggregator.observe(&reason("LENGTH"));
        aggregator.observe(&usage(UsageUpdate {
            completion_tokens: Some(7),
            ..Default::default()
        }));

        match aggregator.finish().unwrap() {
            StreamPart::Finish { reason, usage } => {
                assert_eq!(reason.unified, UnifiedReason::Length);
                assert_eq!(reason.raw, "LENGTH");
                assert_eq!(usage.prompt_tokens, 10);
                assert_eq!(usage.completion_tokens, 7);
                assert_eq!(usage.reasoning_tokens, Some(4));
                assert_eq!(usage.accepted_prediction_tokens, None);
            }
            other => panic!("unexpected part {:?}", other),
        }
    }

    #[test]
    fn test_observations_after_finish_are_ignored() {
        let mut aggregator = FinishAggregator::new();
        aggregator.observe(&reason("STOP"));
        aggregator.finish();
        aggregator.observe(&reason("ERROR"));

        assert_eq!(aggregator.reason().raw, "STOP");
    }
}
