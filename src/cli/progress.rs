//! Terminal progress bar fed by ingestion progress events.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::models::ProgressEvent;
use crate::services::ProgressSink;

pub struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    /// A percent-scaled bar drawn on stderr, hidden when `quiet`.
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::hidden())
        } else {
            ProgressBar::new(100)
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Print a line above the bar without tearing it.
    pub fn println(&self, message: impl AsRef<str>) {
        self.bar.println(message);
    }
}

impl ProgressSink for ProgressBarSink {
    fn on_progress(&self, event: &ProgressEvent) {
        self.bar.set_position(u64::from(event.percent));
        self.bar.set_message(event.message.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_move_the_bar() {
        let sink = ProgressBarSink::new(true);
        sink.on_progress(&ProgressEvent::new("Embedding batch 1/2", 45));
        assert_eq!(sink.bar.position(), 45);
        assert_eq!(sink.bar.message(), "Embedding batch 1/2");

        sink.on_progress(&ProgressEvent::new("Vector index ready", 100));
        assert_eq!(sink.bar.position(), 100);
        sink.finish();
    }
}
