//! # triage-vector
//!
//! Guideline knowledge bases: a flat L2 index over guideline embeddings
//! paired with the metadata records the vectors were built from.
//!
//! ## Features
//! - Exact squared-L2 nearest-neighbor search (`FlatL2Index`)
//! - Little-endian binary index files and JSON metadata files
//! - `KnowledgeBase`: index and records kept aligned position by position
//! - `SharedKnowledgeBase`: read-mostly handle with atomic swap on reload
//! - `build_knowledge_base`: embed records and write both files

pub mod build;
pub mod codec;
pub mod error;
pub mod flat;
pub mod index;
pub mod knowledge;
pub mod metadata;

pub use build::{build_knowledge_base, BuildStats};
pub use codec::{read_index, write_index};
pub use error::VectorError;
pub use flat::FlatL2Index;
pub use index::{IndexStats, SearchResult, VectorIndex};
pub use knowledge::{Alignment, KnowledgeBase, SharedKnowledgeBase};
pub use metadata::{load_metadata, save_metadata};
