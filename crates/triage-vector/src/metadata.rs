//! Guideline metadata storage.
//!
//! A JSON array of `GuidelineRecord`, one per vector, in vector order.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::debug;
use triage_types::GuidelineRecord;

use crate::error::VectorError;

pub fn load_metadata(path: &Path) -> Result<Vec<GuidelineRecord>, VectorError> {
    let reader = BufReader::new(File::open(path)?);
    let records: Vec<GuidelineRecord> = serde_json::from_reader(reader)?;
    debug!(path = ?path, records = records.len(), "Metadata loaded");
    Ok(records)
}

pub fn save_metadata(records: &[GuidelineRecord], path: &Path) -> Result<(), VectorError> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, records)?;
    out.flush()?;
    Ok(())
}
