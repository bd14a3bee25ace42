//! Vector index trait and types.
//!
//! Defines the interface for vector similarity search.

use triage_embeddings::Embedding;

use crate::error::VectorError;

/// Result of a vector search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Position of the vector in insertion order (aligned with metadata)
    pub position: usize,
    /// Squared L2 distance, lower = more similar
    pub distance: f32,
}

impl SearchResult {
    pub fn new(position: usize, distance: f32) -> Self {
        Self { position, distance }
    }
}

/// Index statistics
#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    /// Number of vectors in the index
    pub vector_count: usize,
    /// Embedding dimension
    pub dimension: usize,
    /// In-memory size of the vector data
    pub size_bytes: u64,
}

/// Trait for vector indexes.
///
/// Implementations must be thread-safe for concurrent read access.
/// Vectors are addressed by insertion position.
pub trait VectorIndex: Send + Sync {
    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the number of vectors in the index
    fn len(&self) -> usize;

    /// Check if the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a vector; its position is the previous `len()`.
    fn add(&mut self, embedding: &Embedding) -> Result<usize, VectorError>;

    /// Append multiple vectors in order.
    fn add_batch(&mut self, embeddings: &[Embedding]) -> Result<(), VectorError> {
        for emb in embeddings {
            self.add(emb)?;
        }
        Ok(())
    }

    /// Search for the k nearest neighbors.
    ///
    /// Returns at most `min(k, len())` results ordered nearest first.
    /// An empty index yields an empty result, not an error.
    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>, VectorError>;

    /// Get index statistics
    fn stats(&self) -> IndexStats;
}
