//! Building a knowledge base from guideline records.

use std::path::{Path, PathBuf};

use tracing::info;
use triage_embeddings::EmbeddingModel;
use triage_types::{DomainPaths, GuidelineRecord};

use crate::codec::write_index;
use crate::error::VectorError;
use crate::flat::FlatL2Index;
use crate::index::VectorIndex;
use crate::metadata::save_metadata;

const EMBED_BATCH: usize = 32;

/// Outcome of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStats {
    pub records: usize,
    pub dimension: usize,
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Embed each record's text chunk and write the index and metadata files.
///
/// Both files are written beside their targets and renamed into place only
/// after both writes succeed.
pub async fn build_knowledge_base(
    records: &[GuidelineRecord],
    embedder: &dyn EmbeddingModel,
    paths: &DomainPaths,
) -> Result<BuildStats, VectorError> {
    let dimension = embedder.info().dimension;
    let mut index = FlatL2Index::new(dimension);

    for batch in records.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch
            .iter()
            .map(|r| r.original_text_chunk().to_string())
            .collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        index.add_batch(&embeddings)?;
    }

    if index.len() != records.len() {
        return Err(VectorError::Misaligned {
            vectors: index.len(),
            records: records.len(),
        });
    }

    for path in [&paths.index_path, &paths.metadata_path] {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let index_tmp = temp_path(&paths.index_path);
    let metadata_tmp = temp_path(&paths.metadata_path);
    write_index(&index, &index_tmp)?;
    save_metadata(records, &metadata_tmp)?;
    std::fs::rename(&metadata_tmp, &paths.metadata_path)?;
    std::fs::rename(&index_tmp, &paths.index_path)?;

    info!(
        records = records.len(),
        dimension,
        index = ?paths.index_path,
        "Knowledge base built"
    );

    Ok(BuildStats {
        records: records.len(),
        dimension,
    })
}
