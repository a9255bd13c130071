//! In-memory vector index with exact nearest-neighbor search.
//!
//! [`IndexBuilder`] accumulates `(vector, chunk)` pairs batch by batch and
//! checks that every vector shares one dimensionality. [`IndexBuilder::finalize`]
//! packs the vectors into a row-major matrix; the resulting [`VectorIndex`] is
//! read-only and can be shared across threads for concurrent searches.
//!
//! Ids are positions in insertion order: `0..len`, never reused.

use ndarray::{Array2, ArrayView1};

use crate::error::{IndexError, SearchError};
use crate::models::{Chunk, SearchHit};

/// Incremental index construction.
#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    dimension: Option<usize>,
    data: Vec<f32>,
    chunks: Vec<Chunk>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Dimensionality fixed by the first appended vector.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Append pairs in order. Either every pair is appended or none is.
    pub fn append<I>(&mut self, pairs: I) -> Result<(), IndexError>
    where
        I: IntoIterator<Item = (Vec<f32>, Chunk)>,
    {
        let pairs: Vec<(Vec<f32>, Chunk)> = pairs.into_iter().collect();
        let mut dimension = self.dimension;

        for (offset, (vector, _)) in pairs.iter().enumerate() {
            let position = self.chunks.len() + offset;
            if vector.is_empty() {
                return Err(IndexError::Shape(format!(
                    "empty embedding vector at entry {position}"
                )));
            }
            match dimension {
                Some(expected) if expected != vector.len() => {
                    return Err(IndexError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                        position,
                    });
                }
                Some(_) => {}
                None => dimension = Some(vector.len()),
            }
        }

        self.dimension = dimension;
        self.data.reserve(pairs.len() * dimension.unwrap_or(0));
        self.chunks.reserve(pairs.len());
        for (vector, chunk) in pairs {
            self.data.extend_from_slice(&vector);
            self.chunks.push(chunk);
        }
        Ok(())
    }

    /// Pack the accumulated vectors into a searchable index.
    pub fn finalize(self) -> Result<VectorIndex, IndexError> {
        let rows = self.chunks.len();
        let cols = self.dimension.unwrap_or(0);
        let vectors = Array2::from_shape_vec((rows, cols), self.data)?;
        Ok(VectorIndex {
            vectors,
            chunks: self.chunks,
        })
    }
}

/// Build an index from the full pair sequence in one shot.
pub fn build<I>(pairs: I) -> Result<VectorIndex, IndexError>
where
    I: IntoIterator<Item = (Vec<f32>, Chunk)>,
{
    let mut builder = IndexBuilder::new();
    builder.append(pairs)?;
    builder.finalize()
}

/// Finalized, read-only vector index.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    vectors: Array2<f32>,
    chunks: Vec<Chunk>,
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::empty()
    }
}

impl VectorIndex {
    pub fn empty() -> Self {
        Self {
            vectors: Array2::zeros((0, 0)),
            chunks: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Vector dimensionality; 0 for an empty index.
    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Vector and chunk stored under `id`.
    pub fn get(&self, id: usize) -> Option<(ArrayView1<'_, f32>, &Chunk)> {
        let chunk = self.chunks.get(id)?;
        Some((self.vectors.row(id), chunk))
    }

    /// Exact k-nearest-neighbor search under squared Euclidean distance.
    ///
    /// Results are ordered nearest first, ties broken by id. Asking for more
    /// neighbors than the index holds returns every entry.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, SearchError> {
        if k == 0 {
            return Err(SearchError::InvalidQuery(
                "k must be at least 1".to_string(),
            ));
        }
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension() {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension(),
                actual: query.len(),
            });
        }

        let query = ArrayView1::from(query);
        let mut ranked: Vec<(usize, f32)> = self
            .vectors
            .rows()
            .into_iter()
            .map(|row| {
                let diff = &row - &query;
                diff.dot(&diff)
            })
            .enumerate()
            .collect();

        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);

        Ok(ranked
            .into_iter()
            .map(|(id, distance)| SearchHit {
                id,
                distance,
                chunk: self.chunks[id].clone(),
            })
            .collect())
    }
}
