pub mod batch;
mod chunker;
pub mod embedding;
pub mod index;
pub mod progress;
mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{IngestOptions, batch_count, ingest};
pub use chunker::TextChunker;
pub use embedding::{EmbeddingProvider, GeminiEmbeddingClient, TaskType};
pub use index::{IndexBuilder, VectorIndex, build};
pub use progress::{ProgressRange, ProgressSink};
pub use session::{DocumentSession, IngestSummary, context_for};
