//! Guideline records and retrieval hits.
//!
//! A `GuidelineRecord` is one chunk of source text that was embedded when the
//! knowledge base was built. Records are identified only by their position in
//! the metadata file, which mirrors vector order in the index.

use serde::{Deserialize, Deserializer, Serialize};

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Kind of source document a record was chunked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    /// National guideline (CHO/CHEW standing orders, clinical protocols)
    Guideline,
    /// Medical textbook disease entry
    Textbook,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Guideline => "Guideline",
            SourceType::Textbook => "Textbook",
        }
    }
}

/// A guideline case entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidelineEntry {
    pub source_document_name: String,
    #[serde(default)]
    pub section_title: String,
    #[serde(default)]
    pub age_group: String,
    #[serde(default)]
    pub subsection_code: String,
    #[serde(default)]
    pub subsection_title: String,
    /// Case description (e.g. "Cough or difficult breathing")
    #[serde(default)]
    pub case: String,
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(default)]
    pub examination: Vec<String>,
    #[serde(default)]
    pub clinical_judgement: String,
    /// Recommended actions, in guideline order
    #[serde(default, rename = "action")]
    pub actions: Vec<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    /// Text that was embedded for this record
    pub original_text_chunk: String,
}

/// Disease metadata carried by textbook entries.
///
/// Textbook extracts are copied through as-is, so any field may be missing
/// or `null`; both read as empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub disease: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub symptoms: Vec<String>,
    /// Remaining textbook fields (diagnosis, treatment, synonyms, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A textbook disease entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextbookEntry {
    pub source_document_name: String,
    pub disease_info: DiseaseInfo,
    /// Text that was embedded for this record
    pub original_text_chunk: String,
}

/// One chunk of source text in a knowledge base.
///
/// Serialized with `source_type` as the tag so metadata files stay readable
/// by the tooling that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_type")]
pub enum GuidelineRecord {
    Guideline(GuidelineEntry),
    Textbook(TextbookEntry),
}

impl GuidelineRecord {
    pub fn source_type(&self) -> SourceType {
        match self {
            GuidelineRecord::Guideline(_) => SourceType::Guideline,
            GuidelineRecord::Textbook(_) => SourceType::Textbook,
        }
    }

    pub fn source_document_name(&self) -> &str {
        match self {
            GuidelineRecord::Guideline(g) => &g.source_document_name,
            GuidelineRecord::Textbook(t) => &t.source_document_name,
        }
    }

    /// The text chunk that produced this record's embedding.
    pub fn original_text_chunk(&self) -> &str {
        match self {
            GuidelineRecord::Guideline(g) => &g.original_text_chunk,
            GuidelineRecord::Textbook(t) => &t.original_text_chunk,
        }
    }

    /// Short human-readable label: the case for guidelines, the disease for textbooks.
    pub fn title(&self) -> &str {
        match self {
            GuidelineRecord::Guideline(g) => &g.case,
            GuidelineRecord::Textbook(t) => &t.disease_info.disease,
        }
    }
}

/// A record returned for a query, with its squared L2 distance (lower = closer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub record: GuidelineRecord,
    pub distance: f32,
}

impl RetrievalHit {
    pub fn new(record: GuidelineRecord, distance: f32) -> Self {
        Self { record, distance }
    }
}
