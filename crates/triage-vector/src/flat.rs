//! Exact (brute-force) squared-L2 index.
//!
//! Vectors are stored contiguously in insertion order. Search scores every
//! vector and stable-sorts, so equal distances keep insertion order.

use tracing::debug;
use triage_embeddings::Embedding;

use crate::error::VectorError;
use crate::index::{IndexStats, SearchResult, VectorIndex};

#[derive(Debug, Clone)]
pub struct FlatL2Index {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Build from contiguous vector data (`len * dimension` values).
    pub fn from_raw(dimension: usize, data: Vec<f32>) -> Result<Self, VectorError> {
        if dimension == 0 {
            return Err(VectorError::Format("dimension must be non-zero".to_string()));
        }
        if data.len() % dimension != 0 {
            return Err(VectorError::Format(format!(
                "{} values is not a multiple of dimension {}",
                data.len(),
                dimension
            )));
        }
        Ok(Self { dimension, data })
    }

    /// Raw vector data in insertion order.
    pub fn as_raw(&self) -> &[f32] {
        &self.data
    }

    /// Vector at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Keep only the first `len` vectors.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len * self.dimension);
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl VectorIndex for FlatL2Index {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    fn add(&mut self, embedding: &Embedding) -> Result<usize, VectorError> {
        if embedding.dimension() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.dimension(),
            });
        }
        let position = self.len();
        self.data.extend_from_slice(embedding.as_slice());
        Ok(position)
    }

    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>, VectorError> {
        let count = self.len();
        if count == 0 || k == 0 {
            return Ok(Vec::new());
        }
        if query.dimension() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: query.dimension(),
            });
        }

        let mut scored: Vec<SearchResult> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, v)| SearchResult::new(position, squared_l2(query.as_slice(), v)))
            .collect();

        // sort_by is stable: ties stay in insertion order
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k.min(count));

        debug!(k, returned = scored.len(), "Flat index searched");
        Ok(scored)
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            vector_count: self.len(),
            dimension: self.dimension,
            size_bytes: (self.data.len() * std::mem::size_of::<f32>()) as u64,
        }
    }
}
