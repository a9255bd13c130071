//! Per-document retrieval context.
//!
//! A [`DocumentSession`] is what the question-answering side holds on to
//! after ingestion: the finalized index plus a few facts about the document.
//! Callers own its lifetime and pass it to each search explicitly.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{IndexError, SearchError};
use crate::models::{Chunk, Document, SearchHit};
use crate::services::batch::{IngestOptions, batch_count, ingest};
use crate::services::chunker::TextChunker;
use crate::services::embedding::EmbeddingProvider;
use crate::services::index::VectorIndex;
use crate::services::progress::ProgressSink;
use crate::utils::{RetryConfig, with_retry};

/// Facts about an ingestion run, for summaries.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IngestSummary {
    pub document: String,
    pub text_length: usize,
    pub chunk_count: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_count: usize,
    pub duration_ms: u64,
}

/// An ingested document ready for similarity search.
#[derive(Debug, Clone)]
pub struct DocumentSession {
    summary: IngestSummary,
    index: Arc<VectorIndex>,
}

impl DocumentSession {
    /// Chunk `document` and embed it into a fresh index.
    pub async fn ingest(
        document: &Document,
        chunker: &TextChunker,
        provider: &dyn EmbeddingProvider,
        options: &IngestOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Self, IndexError> {
        let chunks = chunker.chunk(document);
        debug!(document = %document.name, chunks = chunks.len(), "document chunked");

        let mut session =
            Self::ingest_chunks(&document.name, &chunks, provider, options, progress).await?;
        session.summary.text_length = document.text_length();
        session.summary.chunk_size = chunker.chunk_size();
        session.summary.chunk_overlap = chunker.overlap();
        Ok(session)
    }

    /// Embed pre-chunked text into a fresh index.
    pub async fn ingest_chunks(
        name: &str,
        chunks: &[Chunk],
        provider: &dyn EmbeddingProvider,
        options: &IngestOptions,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Self, IndexError> {
        let start = Instant::now();
        let index = ingest(provider, chunks, options, progress).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(document = name, entries = index.len(), duration_ms, "document ingested");

        Ok(Self {
            summary: IngestSummary {
                document: name.to_string(),
                text_length: chunks.iter().map(|c| c.text.chars().count()).sum(),
                chunk_count: chunks.len(),
                chunk_size: 0,
                chunk_overlap: 0,
                batch_count: batch_count(chunks.len(), options.batch_size),
                duration_ms,
            },
            index: Arc::new(index),
        })
    }

    pub fn summary(&self) -> &IngestSummary {
        &self.summary
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Nearest chunks to an already embedded query.
    pub fn search_vector(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, SearchError> {
        self.index.search(query, k)
    }

    /// Embed `query` through the provider's query path, then search.
    ///
    /// The query call gets the same rate-limit retry policy as ingestion.
    pub async fn search_text(
        &self,
        provider: &dyn EmbeddingProvider,
        query: &str,
        k: usize,
        retry: &RetryConfig,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidQuery(
                "query cannot be empty".to_string(),
            ));
        }
        if k == 0 {
            return Err(SearchError::InvalidQuery(
                "k must be at least 1".to_string(),
            ));
        }
        if self.index.is_empty() {
            return Ok(Vec::new());
        }

        let vector = with_retry(retry, || provider.embed_query(query))
            .await
            .into_result()?;
        self.search_vector(&vector, k)
    }
}

/// Join retrieved chunks into a context block for an answer generator.
pub fn context_for(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| hit.chunk.text.trim())
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkingConfig;
    use crate::services::testing::{Fault, ScriptedProvider, numbered_chunks};
    use std::time::Duration;

    fn options() -> IngestOptions {
        IngestOptions::default()
            .with_batch_size(4)
            .with_inter_batch_delay(Duration::ZERO)
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_text_finds_exact_chunk() {
        let provider = ScriptedProvider::new();
        let session =
            DocumentSession::ingest_chunks("doc", &numbered_chunks(10), &provider, &options(), None)
                .await
                .unwrap();

        let hits = session
            .search_text(&provider, "7", 1, &RetryConfig::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 7);
        assert_eq!(hits[0].chunk.text, "chunk 7");
        assert_eq!(hits[0].distance, 0.0);

        assert_eq!(session.summary().chunk_count, 10);
        assert_eq!(session.summary().batch_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_k_larger_than_session_returns_all() {
        let provider = ScriptedProvider::new();
        let session =
            DocumentSession::ingest_chunks("doc", &numbered_chunks(3), &provider, &options(), None)
                .await
                .unwrap();

        let hits = session
            .search_text(&provider, "2", 5, &RetryConfig::default())
            .await
            .unwrap();
        let ids: Vec<usize> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![2, 1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_query_rejected() {
        let provider = ScriptedProvider::new();
        let session =
            DocumentSession::ingest_chunks("doc", &numbered_chunks(3), &provider, &options(), None)
                .await
                .unwrap();

        let err = session
            .search_text(&provider, "   ", 3, &RetryConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidQuery(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_session_search() {
        let provider = ScriptedProvider::new();
        let session = DocumentSession::ingest_chunks("doc", &[], &provider, &options(), None)
            .await
            .unwrap();

        let hits = session
            .search_text(&provider, "1", 3, &RetryConfig::default())
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ingest_document_records_facts() {
        let provider = ScriptedProvider::new();
        let chunker = TextChunker::new(&ChunkingConfig {
            chunk_size: 100,
            ..Default::default()
        });
        let content = "Sift splits documents into overlapping chunks. ".repeat(10);
        let document = Document::new("guide.txt", content.clone());

        let session = DocumentSession::ingest(&document, &chunker, &provider, &options(), None)
            .await
            .unwrap();

        let summary = session.summary();
        assert_eq!(summary.document, "guide.txt");
        assert_eq!(summary.text_length, content.chars().count());
        assert_eq!(summary.chunk_size, 100);
        assert_eq!(summary.chunk_overlap, 20);
        assert_eq!(summary.chunk_count, session.index().len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_ingest_yields_no_session() {
        let provider = ScriptedProvider::new().with_faults(0, [Fault::Fatal]);
        let result =
            DocumentSession::ingest_chunks("doc", &numbered_chunks(3), &provider, &options(), None)
                .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_context_for_joins_chunks() {
        let hits = vec![
            SearchHit {
                id: 0,
                distance: 0.0,
                chunk: Chunk::new(" first "),
            },
            SearchHit {
                id: 1,
                distance: 1.0,
                chunk: Chunk::new("second"),
            },
        ];
        assert_eq!(context_for(&hits), "first\n\n---\n\nsecond");
    }
}
