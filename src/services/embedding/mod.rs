//! Embedding provider abstraction.
//!
//! The ingestion pipeline only needs "texts in, same-length vectors out".
//! Backends implement [`EmbeddingProvider`]; the Gemini HTTP client is the
//! one shipped with the CLI.

mod gemini;

pub use gemini::{GeminiEmbeddingClient, TaskType};

use async_trait::async_trait;

use crate::error::EmbeddingError;

/// Converts texts into fixed-dimension vectors with one remote call.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed documents for indexing. Output has the same length and order as `texts`.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut embeddings = self.embed_documents(&[text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }

    /// Model identifier, for logs and summaries.
    fn model(&self) -> &str;
}
