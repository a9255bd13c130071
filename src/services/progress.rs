//! Progress reporting for ingestion.

use crate::models::ProgressEvent;

/// Observer for ingestion progress. Called inline; must return quickly.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Sub-range of an outer pipeline's 0-100 scale occupied by the embedding phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRange {
    pub start: u8,
    pub end: u8,
}

impl Default for ProgressRange {
    fn default() -> Self {
        Self { start: 0, end: 90 }
    }
}

impl ProgressRange {
    pub fn new(start: u8, end: u8) -> Self {
        let end = end.min(100);
        Self {
            start: start.min(end),
            end,
        }
    }

    /// Map `done / total` onto the range. An empty total maps to the end.
    pub fn scale(&self, done: usize, total: usize) -> u8 {
        if total == 0 {
            return self.end;
        }
        let span = u64::from(self.end.saturating_sub(self.start));
        let done = done.min(total) as u64;
        self.start + (span * done / total as u64) as u8
    }
}

/// Emits events to an optional sink.
pub(crate) struct Reporter<'a> {
    sink: Option<&'a dyn ProgressSink>,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(sink: Option<&'a dyn ProgressSink>) -> Self {
        Self { sink }
    }

    pub(crate) fn emit(&self, message: impl Into<String>, percent: u8) {
        if let Some(sink) = self.sink {
            sink.on_progress(&ProgressEvent::new(message, percent));
        }
    }
}
