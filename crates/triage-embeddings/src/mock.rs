//! Deterministic embedder for tests and offline index builds.
//!
//! Each lowercase alphanumeric token is hashed (FNV-1a) into one of
//! `dimension` buckets, then the vector is normalized. Texts that share
//! words land close together, which is enough to exercise ranking.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(FNV_OFFSET, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

pub struct MockEmbedder {
    info: ModelInfo,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            info: ModelInfo {
                name: "mock-bow".to_string(),
                dimension,
            },
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    /// Number of `embed` calls that reached this model.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make subsequent calls fail with a service error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Embed synchronously. Used when building fixture indexes.
    pub fn vector_for(&self, text: &str) -> Embedding {
        let dim = self.info.dimension.max(1);
        let mut values = vec![0.0f32; self.info.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let bucket = (fnv1a(&token) % dim as u64) as usize;
            if let Some(v) = values.get_mut(bucket) {
                *v += 1.0;
            }
        }
        Embedding::new(values)
    }
}

#[async_trait]
impl EmbeddingModel for MockEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmbeddingError::Service("mock embedder offline".to_string()));
        }
        Ok(self.vector_for(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deterministic() {
        let m = MockEmbedder::new(32);
        let a = m.embed("fever and cough").await.unwrap();
        let b = m.embed("Fever AND cough").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dimension(), 32);
        assert_eq!(m.call_count(), 2);
    }

    #[test]
    fn test_shared_words_closer() {
        let m = MockEmbedder::new(64);
        let q = m.vector_for("fever cough");
        let near = m.vector_for("fever cough chills");
        let far = m.vector_for("broken arm bleeding");

        let dist = |a: &Embedding, b: &Embedding| -> f32 {
            a.values
                .iter()
                .zip(&b.values)
                .map(|(x, y)| (x - y) * (x - y))
                .sum()
        };
        assert!(dist(&q, &near) < dist(&q, &far));
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let m = MockEmbedder::new(4);
        m.set_failing(true);
        assert!(m.embed("fever").await.is_err());
    }
}
