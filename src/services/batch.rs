//! Batched embedding ingestion.
//!
//! Chunks are embedded one batch per remote call, strictly in order. Rate
//! limited batches are retried with exponential backoff; any other provider
//! failure aborts the run. A successful run always ends with a 100% event.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{EmbeddingError, IndexError, QuotaDiagnostics};
use crate::models::{Chunk, IngestConfig};
use crate::services::embedding::EmbeddingProvider;
use crate::services::index::{IndexBuilder, VectorIndex};
use crate::services::progress::{ProgressRange, ProgressSink, Reporter};
use crate::utils::{RetryConfig, RetryResult, Retryable, with_retry_notify};

/// Knobs for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub batch_size: usize,
    /// Idle wait after each successful non-final batch.
    pub inter_batch_delay: Duration,
    pub retry: RetryConfig,
    /// Share of the caller's progress scale used while embedding.
    pub progress: ProgressRange,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from(&IngestConfig::default())
    }
}

impl From<&IngestConfig> for IngestOptions {
    fn from(config: &IngestConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            inter_batch_delay: config.inter_batch_delay(),
            retry: config.retry_config(),
            progress: ProgressRange::new(config.progress_start, config.progress_end),
        }
    }
}

impl IngestOptions {
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay = delay;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_progress_range(mut self, progress: ProgressRange) -> Self {
        self.progress = progress;
        self
    }
}

/// Number of embedding calls needed for `chunk_count` chunks.
pub fn batch_count(chunk_count: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    chunk_count.div_ceil(batch_size)
}

/// Embed `chunks` batch by batch and build a vector index from the results.
///
/// Ids in the returned index follow the order of `chunks`. On any error no
/// index is returned; batches embedded before the failure are discarded.
pub async fn ingest(
    provider: &dyn EmbeddingProvider,
    chunks: &[Chunk],
    options: &IngestOptions,
    progress: Option<&dyn ProgressSink>,
) -> Result<VectorIndex, IndexError> {
    if options.batch_size == 0 {
        return Err(IndexError::InvalidOptions(
            "batch size must be greater than 0".to_string(),
        ));
    }

    let reporter = Reporter::new(progress);
    let range = options.progress;
    let total = chunks.len();
    let batches = batch_count(total, options.batch_size);

    info!(
        chunks = total,
        batches,
        batch_size = options.batch_size,
        model = provider.model(),
        "starting embedding ingestion"
    );
    reporter.emit(
        format!("Embedding {total} chunks in {batches} batches"),
        range.start,
    );

    let mut builder = IndexBuilder::new();

    for (batch_index, batch) in chunks.chunks(options.batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
        let position = range.scale(batch_index, batches);

        let outcome = with_retry_notify(
            &options.retry,
            || provider.embed_documents(&texts),
            |wait| {
                warn!(
                    batch = batch_index + 1,
                    attempt = wait.attempt,
                    delay_ms = wait.delay.as_millis() as u64,
                    "embedding rate limited, backing off"
                );
                reporter.emit(
                    format!(
                        "Rate limited on batch {}/{}; waiting {:.1}s before retry {}/{}",
                        batch_index + 1,
                        batches,
                        wait.delay.as_secs_f64(),
                        wait.attempt + 1,
                        options.retry.max_retries
                    ),
                    position,
                );
            },
        )
        .await;

        let vectors = match outcome {
            RetryResult::Success(vectors) => vectors,
            RetryResult::Failed {
                last_error,
                attempts,
            } => {
                return Err(batch_failure(
                    last_error,
                    attempts,
                    batch_index,
                    batches,
                    total,
                ));
            }
        };

        if vectors.len() != batch.len() {
            return Err(IndexError::LengthMismatch {
                expected: batch.len(),
                actual: vectors.len(),
            });
        }

        builder.append(vectors.into_iter().zip(batch.iter().cloned()))?;

        let done = batch_index + 1;
        debug!(batch = done, indexed = builder.len(), "batch embedded");
        reporter.emit(
            format!(
                "Embedded batch {done}/{batches} ({} of {total} chunks)",
                builder.len()
            ),
            range.scale(done, batches),
        );

        if done < batches && !options.inter_batch_delay.is_zero() {
            sleep(options.inter_batch_delay).await;
        }
    }

    reporter.emit("Building vector index", range.end);
    let index = builder.finalize()?;

    info!(entries = index.len(), dimension = index.dimension(), "vector index ready");
    reporter.emit(
        format!("Vector index ready with {} entries", index.len()),
        100,
    );

    Ok(index)
}

fn batch_failure(
    error: EmbeddingError,
    attempts: u32,
    batch_index: usize,
    batch_count: usize,
    chunk_count: usize,
) -> IndexError {
    if !error.is_retryable() {
        warn!(batch = batch_index + 1, error = %error, "embedding failed, aborting ingestion");
        return IndexError::Embedding(error);
    }

    let retry_after = error.retry_hint();
    let last_message = match error {
        EmbeddingError::RateLimited { message, .. } => message,
        other => other.to_string(),
    };

    warn!(
        batch = batch_index + 1,
        attempts, "embedding retries exhausted, quota exceeded"
    );

    IndexError::QuotaExceeded(QuotaDiagnostics {
        chunk_count,
        batch_index,
        batch_count,
        remaining_calls: batch_count - batch_index,
        attempts,
        retry_after,
        last_message,
    })
}
