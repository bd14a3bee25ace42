//! # triage-embeddings
//!
//! Text embeddings for guideline retrieval.
//!
//! The embedding model is an external service; this crate provides the
//! client, the `EmbeddingModel` seam the retrievers depend on, and a
//! governed wrapper that routes every embedding call through the shared
//! `CallGovernor`.
//!
//! ## Features
//! - Async `EmbeddingModel` trait (thread-safe, shareable behind `Arc`)
//! - `HttpEmbedder` for Ollama-compatible embedding endpoints, with retry
//! - `GovernedEmbedder`: cached, rate-limited embedding
//! - `MockEmbedder`: deterministic bag-of-words vectors for tests

pub mod error;
pub mod governed;
pub mod http;
pub mod mock;
pub mod model;

pub use error::EmbeddingError;
pub use governed::GovernedEmbedder;
pub use http::{HttpEmbedder, HttpEmbedderConfig};
pub use mock::MockEmbedder;
pub use model::{Embedding, EmbeddingModel, ModelInfo};
