//! Scripted embedding provider for pipeline tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::EmbeddingError;
use crate::models::Chunk;
use crate::services::EmbeddingProvider;

/// What the provider does instead of a normal response.
#[derive(Debug, Clone)]
pub enum Fault {
    RateLimited(Option<Duration>),
    Fatal,
    /// Return one vector fewer than requested.
    ShortResponse,
    /// Succeed with vectors of this dimension.
    Dimension(usize),
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Vec<String>>,
    call_times: Vec<Instant>,
    completed_batches: usize,
    embedded: usize,
    plan: HashMap<usize, VecDeque<Fault>>,
}

/// Embeds the n-th successfully embedded text as `[n, 1.0, 0.5]`.
///
/// Queries embed to `[value, 1.0, 0.5]` when the text parses as a number.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    state: Mutex<State>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue faults for the batch with the given zero-based index.
    pub fn with_faults(self, batch: usize, faults: impl IntoIterator<Item = Fault>) -> Self {
        self.state
            .lock()
            .unwrap()
            .plan
            .entry(batch)
            .or_default()
            .extend(faults);
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().call_times.clone()
    }
}

#[async_trait]
impl EmbeddingProvider for ScriptedProvider {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(texts.to_vec());
        state.call_times.push(Instant::now());

        let batch = state.completed_batches;
        let fault = state.plan.get_mut(&batch).and_then(VecDeque::pop_front);

        let mut count = texts.len();
        let mut dimension = 3;
        match fault {
            Some(Fault::RateLimited(retry_after)) => {
                return Err(EmbeddingError::RateLimited {
                    message: "RESOURCE_EXHAUSTED: quota exceeded".to_string(),
                    retry_after,
                });
            }
            Some(Fault::Fatal) => {
                return Err(EmbeddingError::ServerError(
                    "status 500: internal error".to_string(),
                ));
            }
            Some(Fault::ShortResponse) => count = count.saturating_sub(1),
            Some(Fault::Dimension(d)) => dimension = d,
            None => {}
        }

        let start = state.embedded;
        state.embedded += texts.len();
        state.completed_batches += 1;

        Ok((start..start + count)
            .map(|n| {
                let mut vector = vec![0.5; dimension];
                vector[0] = n as f32;
                if dimension > 1 {
                    vector[1] = 1.0;
                }
                vector
            })
            .collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let value = text
            .trim()
            .parse::<f32>()
            .map_err(|_| EmbeddingError::InvalidResponse(format!("not a number: {text}")))?;
        Ok(vec![value, 1.0, 0.5])
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

pub fn numbered_chunks(count: usize) -> Vec<Chunk> {
    (0..count)
        .map(|i| Chunk::new(format!("chunk {i}")).with_metadata("chunk_index", i))
        .collect()
}
