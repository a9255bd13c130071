use serde::{Deserialize, Serialize};

/// Informational progress notification emitted during ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub message: String,
    /// Overall progress in `0..=100`.
    pub percent: u8,
}

impl ProgressEvent {
    pub fn new(message: impl Into<String>, percent: u8) -> Self {
        Self {
            message: message.into(),
            percent: percent.min(100),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.percent == 100
    }
}
