mod config;
mod document;
mod progress;
mod search;

pub use config::{
    API_KEY_ENV, ChunkingConfig, Config, DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_URL,
    EmbeddingConfig, IngestConfig, SearchConfig,
};
pub use document::{Chunk, Document};
pub use progress::ProgressEvent;
pub use search::{OutputFormat, SearchHit, SearchResults};
