//! Utility modules.

pub mod file;
pub mod retry;
pub mod text;

pub use file::{calculate_checksum, is_text_file, read_document};
pub use retry::{
    RetryConfig, RetryResult, RetryWait, Retryable, parse_retry_hint, with_retry,
    with_retry_notify,
};
pub use text::{has_extractable_text, has_meaningful_content};
