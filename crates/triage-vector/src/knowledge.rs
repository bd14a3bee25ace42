//! Knowledge bases: an index and its metadata, aligned by position.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{error, info};
use triage_embeddings::Embedding;
use triage_types::{DomainPaths, GuidelineRecord, KnowledgeDomain};

use crate::codec::read_index;
use crate::error::VectorError;
use crate::flat::FlatL2Index;
use crate::index::{IndexStats, SearchResult, VectorIndex};
use crate::metadata::load_metadata;

/// Vector and record counts as found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    pub vectors: usize,
    pub records: usize,
}

impl Alignment {
    pub fn is_aligned(&self) -> bool {
        self.vectors == self.records
    }

    /// Number of positions served when misaligned.
    pub fn usable(&self) -> usize {
        self.vectors.min(self.records)
    }
}

/// A loaded knowledge domain. Immutable once built.
#[derive(Debug)]
pub struct KnowledgeBase {
    domain: KnowledgeDomain,
    index: FlatL2Index,
    records: Vec<GuidelineRecord>,
    alignment: Alignment,
    loaded_at: DateTime<Utc>,
}

impl KnowledgeBase {
    /// Load the index and metadata files for `domain`.
    ///
    /// A count mismatch is logged; with `strict` it fails the load,
    /// otherwise both sides are truncated to the shorter length.
    pub fn load(
        domain: KnowledgeDomain,
        paths: &DomainPaths,
        strict: bool,
    ) -> Result<Self, VectorError> {
        let index = read_index(&paths.index_path)?;
        let records = load_metadata(&paths.metadata_path)?;
        let kb = Self::from_parts(domain, index, records, strict)?;
        info!(
            domain = %domain,
            records = kb.len(),
            dimension = kb.dimension(),
            "Knowledge base loaded"
        );
        Ok(kb)
    }

    pub fn from_parts(
        domain: KnowledgeDomain,
        mut index: FlatL2Index,
        mut records: Vec<GuidelineRecord>,
        strict: bool,
    ) -> Result<Self, VectorError> {
        let alignment = Alignment {
            vectors: index.len(),
            records: records.len(),
        };

        if !alignment.is_aligned() {
            error!(
                domain = %domain,
                vectors = alignment.vectors,
                records = alignment.records,
                "Index and metadata are misaligned; rebuild this knowledge base"
            );
            if strict {
                return Err(VectorError::Misaligned {
                    vectors: alignment.vectors,
                    records: alignment.records,
                });
            }
            let usable = alignment.usable();
            index.truncate(usable);
            records.truncate(usable);
        }

        Ok(Self {
            domain,
            index,
            records,
            alignment,
            loaded_at: Utc::now(),
        })
    }

    /// An empty knowledge base. Searches return nothing.
    pub fn empty(domain: KnowledgeDomain, dimension: usize) -> Self {
        Self {
            domain,
            index: FlatL2Index::new(dimension),
            records: Vec::new(),
            alignment: Alignment {
                vectors: 0,
                records: 0,
            },
            loaded_at: Utc::now(),
        }
    }

    pub fn domain(&self) -> KnowledgeDomain {
        self.domain
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    /// Counts as found at load time, before any truncation.
    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn record(&self, position: usize) -> Option<&GuidelineRecord> {
        self.records.get(position)
    }

    pub fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>, VectorError> {
        self.index.search(query, k)
    }

    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }
}

/// Shared handle to a domain's current knowledge base.
///
/// Readers take a snapshot `Arc`; a reload builds the replacement fully
/// and then swaps the pointer, so no reader sees a partial pair.
#[derive(Debug)]
pub struct SharedKnowledgeBase {
    current: RwLock<Arc<KnowledgeBase>>,
}

impl SharedKnowledgeBase {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self {
            current: RwLock::new(Arc::new(kb)),
        }
    }

    pub fn snapshot(&self) -> Arc<KnowledgeBase> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Publish `kb`, returning the one it replaced.
    pub fn swap(&self, kb: KnowledgeBase) -> Arc<KnowledgeBase> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(kb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::write_index;
    use crate::metadata::save_metadata;
    use tempfile::TempDir;
    use triage_types::GuidelineEntry;

    fn record(case: &str) -> GuidelineRecord {
        GuidelineRecord::Guideline(GuidelineEntry {
            source_document_name: "CHW Manual".to_string(),
            section_title: String::new(),
            age_group: String::new(),
            subsection_code: String::new(),
            subsection_title: String::new(),
            case: case.to_string(),
            history: vec![],
            examination: vec![],
            clinical_judgement: String::new(),
            actions: vec![],
            notes: vec![],
            original_text_chunk: case.to_string(),
        })
    }

    fn index(n: usize) -> FlatL2Index {
        let mut index = FlatL2Index::new(2);
        for i in 0..n {
            index
                .add(&Embedding::from_normalized(vec![i as f32, 0.0]))
                .unwrap();
        }
        index
    }

    #[test]
    fn test_misaligned_truncates() {
        let kb = KnowledgeBase::from_parts(
            KnowledgeDomain::Chw,
            index(3),
            vec![record("a"), record("b")],
            false,
        )
        .unwrap();

        assert_eq!(kb.len(), 2);
        assert_eq!(kb.stats().vector_count, 2);
        assert!(!kb.alignment().is_aligned());

        let hits = kb
            .search(&Embedding::from_normalized(vec![5.0, 0.0]), 10)
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| kb.record(h.position).is_some()));
    }

    #[test]
    fn test_misaligned_strict_fails() {
        let err = KnowledgeBase::from_parts(
            KnowledgeDomain::Clinical,
            index(1),
            vec![record("a"), record("b")],
            true,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            VectorError::Misaligned {
                vectors: 1,
                records: 2
            }
        ));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let paths = DomainPaths {
            index_path: dir.path().join("kb.index"),
            metadata_path: dir.path().join("kb.json"),
        };
        write_index(&index(2), &paths.index_path).unwrap();
        save_metadata(&[record("fever"), record("cough")], &paths.metadata_path).unwrap();

        let kb = KnowledgeBase::load(KnowledgeDomain::Chw, &paths, true).unwrap();
        assert_eq!(kb.len(), 2);
        assert!(kb.alignment().is_aligned());
        assert_eq!(kb.record(1).map(|r| r.title()), Some("cough"));
    }

    #[test]
    fn test_missing_files_fail() {
        let dir = TempDir::new().unwrap();
        let paths = DomainPaths {
            index_path: dir.path().join("missing.index"),
            metadata_path: dir.path().join("missing.json"),
        };
        assert!(KnowledgeBase::load(KnowledgeDomain::Chw, &paths, false).is_err());
    }

    #[test]
    fn test_swap_keeps_old_snapshots_valid() {
        let shared = SharedKnowledgeBase::new(KnowledgeBase::empty(KnowledgeDomain::Chw, 2));
        let before = shared.snapshot();
        assert!(before.is_empty());

        let kb = KnowledgeBase::from_parts(KnowledgeDomain::Chw, index(1), vec![record("a")], true)
            .unwrap();
        let old = shared.swap(kb);

        assert!(Arc::ptr_eq(&old, &before));
        assert!(before.is_empty());
        assert_eq!(shared.snapshot().len(), 1);
    }
}
