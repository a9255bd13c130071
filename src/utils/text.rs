//! Text processing utilities.

/// Minimum non-whitespace characters for a chunk to be worth embedding.
pub const MIN_CONTENT_LENGTH: usize = 20;

/// Check if content has meaningful text (not just whitespace/punctuation).
pub fn has_meaningful_content(content: &str) -> bool {
    content.chars().filter(|c| c.is_alphanumeric()).count() >= MIN_CONTENT_LENGTH
}

/// True when extraction produced anything besides whitespace.
pub fn has_extractable_text(content: &str) -> bool {
    content.chars().any(|c| !c.is_whitespace())
}
