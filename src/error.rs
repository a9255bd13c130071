//! Error types for the sift document assistant.

use std::time::Duration;

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider rate limited the request: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("failed to connect to embedding provider: {0}")]
    ConnectionError(String),

    #[error("embedding provider error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,

    #[error("no API key configured (set GOOGLE_API_KEY or embedding.api_key)")]
    MissingApiKey,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        // Only quota exhaustion is worth waiting out; everything else aborts ingestion.
        matches!(self, EmbeddingError::RateLimited { .. })
    }

    fn retry_hint(&self) -> Option<Duration> {
        match self {
            EmbeddingError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Diagnostics attached to a terminal quota failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaDiagnostics {
    /// Total chunks submitted for ingestion.
    pub chunk_count: usize,
    /// Zero-based index of the batch that exhausted its retries.
    pub batch_index: usize,
    /// Total number of batches in the ingestion.
    pub batch_count: usize,
    /// Embedding calls still required to finish, including the failed batch.
    pub remaining_calls: usize,
    /// Attempts made for the failed batch.
    pub attempts: u32,
    /// Last retry hint reported by the provider.
    pub retry_after: Option<Duration>,
    /// Provider message from the final attempt.
    pub last_message: String,
}

impl std::fmt::Display for QuotaDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "batch {}/{} failed after {} attempts ({} chunks, {} embedding calls remaining)",
            self.batch_index + 1,
            self.batch_count,
            self.attempts,
            self.chunk_count,
            self.remaining_calls
        )?;
        if let Some(wait) = self.retry_after {
            write!(f, "; provider asked to retry in {}s", wait.as_secs())?;
        }
        write!(f, ": {}", self.last_message)
    }
}

/// Errors related to building the vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("embedding dimension mismatch at entry {position}: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        position: usize,
    },

    #[error("vector count mismatch: expected {expected} vectors, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("embedding quota exceeded: {0}")]
    QuotaExceeded(QuotaDiagnostics),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("index shape error: {0}")]
    Shape(String),

    #[error("invalid ingest options: {0}")]
    InvalidOptions(String),
}

impl From<ndarray::ShapeError> for IndexError {
    fn from(err: ndarray::ShapeError) -> Self {
        IndexError::Shape(err.to_string())
    }
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors raised while loading a document for ingestion.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("file read error: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("file exceeds maximum size: {size} > {max}")]
    TooLarge { size: u64, max: u64 },

    #[error("no text could be extracted from {0}")]
    EmptyExtraction(String),
}

/// Errors related to search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("query dimension mismatch: index holds {expected}-dimensional vectors, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("{0}")]
    Other(String),
}
