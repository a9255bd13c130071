//! Text chunking with overlap for embedding.

use crate::models::{Chunk, ChunkingConfig, Document};
use crate::utils::has_meaningful_content;

/// Splits documents into overlapping chunks of at most `chunk_size` characters.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Characters shared by neighboring chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new text chunker with the given configuration.
    pub fn new(config: &ChunkingConfig) -> Self {
        let chunk_size = config.chunk_size.max(1);
        let overlap = config.overlap().min(chunk_size - 1);
        Self {
            chunk_size,
            overlap,
        }
    }

    /// Create a chunker with default settings.
    pub fn with_defaults() -> Self {
        Self::new(&ChunkingConfig::default())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk a document into overlapping segments, in document order.
    pub fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let content = &document.content;

        if content.trim().is_empty() {
            return Vec::new();
        }

        let spans = self.split_with_overlap(content);
        let single = spans.len() == 1;

        spans
            .into_iter()
            .filter(|(text, _, _)| single || has_meaningful_content(text))
            .enumerate()
            .map(|(idx, (text, start_offset, end_offset))| {
                Chunk::new(text)
                    .with_metadata("source", document.name.as_str())
                    .with_metadata("chunk_index", idx)
                    .with_metadata("start_offset", start_offset)
                    .with_metadata("end_offset", end_offset)
            })
            .collect()
    }

    /// Split content into overlapping `(text, start, end)` spans, offsets in chars.
    fn split_with_overlap(&self, content: &str) -> Vec<(String, usize, usize)> {
        let chars: Vec<char> = content.chars().collect();
        let total = chars.len();
        let mut spans = Vec::new();
        let mut start = 0;

        while start < total {
            let end = (start + self.chunk_size).min(total);
            let adjusted_end = self.find_break_point(&chars, start, end, total);

            let text: String = chars[start..adjusted_end].iter().collect();
            spans.push((text, start, adjusted_end));

            if adjusted_end >= total {
                break;
            }

            // Next window overlaps the tail of this one; always move forward
            let next = adjusted_end.saturating_sub(self.overlap);
            start = if next > start { next } else { adjusted_end };
        }

        spans
    }

    /// Find a natural break point near the target end position.
    fn find_break_point(
        &self,
        chars: &[char],
        start: usize,
        target_end: usize,
        total: usize,
    ) -> usize {
        if target_end >= total {
            return total;
        }

        // Look for a natural break point within the last 20% of the chunk
        let search_start = target_end
            .saturating_sub(self.chunk_size / 5)
            .max(start + 1);
        if search_start >= target_end {
            return target_end;
        }
        let search_range = &chars[search_start..target_end];

        // Priority: double newline > single newline > sentence end > space
        let mut best_break = None;
        let mut last_newline = None;
        let mut last_sentence = None;
        let mut last_space = None;

        for (i, c) in search_range.iter().enumerate() {
            let pos = search_start + i;
            match c {
                '\n' => {
                    if i > 0 && search_range[i - 1] == '\n' {
                        best_break = Some(pos + 1);
                    }
                    last_newline = Some(pos + 1);
                }
                '.' | '!' | '?' => {
                    if search_range.get(i + 1).is_some_and(|c| c.is_whitespace()) {
                        last_sentence = Some(pos + 1);
                    }
                }
                ' ' | '\t' => {
                    last_space = Some(pos + 1);
                }
                _ => {}
            }
        }

        best_break
            .or(last_newline)
            .or(last_sentence)
            .or(last_space)
            .unwrap_or(target_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_document(content: &str) -> Document {
        Document::new("test.txt", content.to_string())
    }

    fn chunker(chunk_size: usize, overlap: usize) -> TextChunker {
        TextChunker::new(&ChunkingConfig {
            chunk_size,
            chunk_overlap: Some(overlap),
            ..Default::default()
        })
    }

    #[test]
    fn test_small_document_single_chunk() {
        let chunker = TextChunker::with_defaults();
        let doc = create_test_document("Hello, world!");
        let chunks = chunker.chunk(&doc);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].metadata["chunk_index"], 0);
        assert_eq!(chunks[0].source(), Some("test.txt"));
    }

    #[test]
    fn test_empty_document() {
        let chunker = TextChunker::with_defaults();
        assert!(chunker.chunk(&create_test_document("")).is_empty());
        assert!(chunker.chunk(&create_test_document(" \n\n ")).is_empty());
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        let chunker = chunker(200, 40);
        let content = "a".repeat(1000);
        let chunks = chunker.chunk(&create_test_document(&content));

        assert!(chunks.len() > 1);
        for (i, chunk) in chunks.iter().enumerate() {
            assert!(chunk.text.chars().count() <= 200);
            assert_eq!(chunk.metadata["chunk_index"], i);
        }
        for pair in chunks.windows(2) {
            let prev_end = pair[0].metadata["end_offset"].as_u64().unwrap();
            let next_start = pair[1].metadata["start_offset"].as_u64().unwrap();
            assert_eq!(prev_end - next_start, 40);
        }
    }

    #[test]
    fn test_chunks_cover_whole_document() {
        let chunker = chunker(120, 60);
        let content = "The quick brown fox jumps over the lazy dog. ".repeat(30);
        let chars: Vec<char> = content.chars().collect();
        let chunks = chunker.chunk(&create_test_document(&content));

        for chunk in &chunks {
            let start = chunk.metadata["start_offset"].as_u64().unwrap() as usize;
            let end = chunk.metadata["end_offset"].as_u64().unwrap() as usize;
            assert_eq!(chunk.text, chars[start..end].iter().collect::<String>());
        }

        let first = chunks.first().unwrap();
        let last = chunks.last().unwrap();
        assert_eq!(first.metadata["start_offset"], 0);
        assert_eq!(
            last.metadata["end_offset"].as_u64().unwrap() as usize,
            content.chars().count()
        );
        for pair in chunks.windows(2) {
            let prev_end = pair[0].metadata["end_offset"].as_u64().unwrap();
            let next_start = pair[1].metadata["start_offset"].as_u64().unwrap();
            assert!(next_start < prev_end, "chunks must not leave gaps");
        }
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let chunker = chunker(100, 0);
        let content = format!("{}\n\n{}", "x".repeat(90), "y".repeat(90));
        let chunks = chunker.chunk(&create_test_document(&content));

        assert_eq!(chunks[0].text, format!("{}\n\n", "x".repeat(90)));
        assert!(chunks[1].text.starts_with('y'));
    }

    #[test]
    fn test_multibyte_text() {
        let chunker = chunker(50, 10);
        let content = "한국어 텍스트와 émoji 🚀 mixed content. ".repeat(10);
        let chunks = chunker.chunk(&create_test_document(&content));
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 50));
    }

    #[test]
    fn test_overlap_clamped_below_chunk_size() {
        let chunker = chunker(10, 50);
        assert_eq!(chunker.overlap(), 9);
        let spans = chunker.split_with_overlap(&"abcdefghij".repeat(5));
        assert_eq!(spans.len(), 41);
        assert_eq!(spans.last().unwrap().2, 50);
    }
}
