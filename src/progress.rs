// 📡 Progress & Cancellation - Stage events and cooperative abort

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// STAGES
// ============================================================================

/// Run state. A run moves strictly forward through these and ends in
/// `Done` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Reading,
    HeaderLocating,
    FormatClassifying,
    Building,
    CurrencyGrouping,
    DuplicateChecking,
    Done,
    Error,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Reading => "reading",
            Stage::HeaderLocating => "header-locating",
            Stage::FormatClassifying => "format-classifying",
            Stage::Building => "building",
            Stage::CurrencyGrouping => "currency-grouping",
            Stage::DuplicateChecking => "duplicate-checking",
            Stage::Done => "done",
            Stage::Error => "error",
        }
    }

    /// Whether the run can no longer advance.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Error)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// EVENTS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCounters {
    pub rows_read: usize,
    pub rows_built: usize,
    pub rows_dropped: usize,
    pub duplicates: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    /// 0.0 - 100.0
    pub percent: f32,
    pub message: String,
    pub counters: ProgressCounters,
}

/// Receives progress events. Fire-and-forget: sinks cannot fail the run.
pub trait ProgressSink {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent),
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

/// Forwards events to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        tracing::info!(
            stage = %event.stage,
            percent = event.percent,
            rows_read = event.counters.rows_read,
            rows_built = event.counters.rows_built,
            rows_dropped = event.counters.rows_dropped,
            duplicates = event.counters.duplicates,
            "{}",
            event.message
        );
    }
}

// ============================================================================
// CANCELLATION
// ============================================================================

/// Shared cancellation flag, checked by the pipeline between chunks.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_closure_sink_receives_events() {
        let seen = RefCell::new(Vec::new());
        let sink = |event: &ProgressEvent| seen.borrow_mut().push(event.stage);

        sink.on_progress(&ProgressEvent {
            stage: Stage::Reading,
            percent: 0.0,
            message: "start".to_string(),
            counters: ProgressCounters::default(),
        });

        assert_eq!(*seen.borrow(), vec![Stage::Reading]);
    }

    #[test]
    fn test_cancellation_token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());

        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::HeaderLocating.to_string(), "header-locating");
        assert!(Stage::Done.is_terminal());
        assert!(!Stage::Building.is_terminal());
    }
}
