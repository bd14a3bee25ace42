//! On-disk index format.
//!
//! Little-endian layout:
//!
//! ```text
//! magic   b"TRIX"
//! version u32 (1)
//! dim     u32
//! count   u64
//! data    count * dim f32
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::mem::size_of;
use std::path::Path;

use tracing::debug;

use crate::error::VectorError;
use crate::flat::FlatL2Index;
use crate::index::VectorIndex;

const MAGIC: &[u8; 4] = b"TRIX";
const VERSION: u32 = 1;
/// magic + version + dim + count
const HEADER_LEN: u64 = 4 + 4 + 4 + 8;

/// Write `index` to `path`, replacing any existing file.
pub fn write_index(index: &FlatL2Index, path: &Path) -> Result<(), VectorError> {
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(MAGIC)?;
    out.write_all(&VERSION.to_le_bytes())?;
    let dim = u32::try_from(index.dimension())
        .map_err(|_| VectorError::Format("dimension exceeds u32".to_string()))?;
    out.write_all(&dim.to_le_bytes())?;
    out.write_all(&(index.len() as u64).to_le_bytes())?;
    for value in index.as_raw() {
        out.write_all(&value.to_le_bytes())?;
    }
    out.flush()?;
    out.into_inner()
        .map_err(|e| VectorError::Io(e.into_error()))?
        .sync_all()?;

    debug!(path = ?path, vectors = index.len(), "Index written");
    Ok(())
}

/// Read an index written by `write_index`.
pub fn read_index(path: &Path) -> Result<FlatL2Index, VectorError> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut input = BufReader::new(file);

    let mut magic = [0u8; 4];
    input.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(VectorError::Format(format!("bad magic in {}", path.display())));
    }

    let version = read_u32(&mut input)?;
    if version != VERSION {
        return Err(VectorError::Format(format!("unsupported version {}", version)));
    }

    let dim = read_u32(&mut input)? as usize;
    let count = read_u64(&mut input)?;
    let data_len = usize::try_from(count)
        .ok()
        .and_then(|c| c.checked_mul(dim))
        .and_then(|total| total.checked_mul(size_of::<f32>()))
        .ok_or_else(|| VectorError::Format(format!("vector count {} too large", count)))?;

    let on_disk = file_len.saturating_sub(HEADER_LEN);
    if on_disk != data_len as u64 {
        return Err(VectorError::Format(format!(
            "expected {} data bytes, found {}",
            data_len, on_disk
        )));
    }

    let mut bytes = Vec::with_capacity(data_len);
    input.read_to_end(&mut bytes)?;
    if bytes.len() != data_len {
        return Err(VectorError::Format(format!(
            "expected {} data bytes, read {}",
            data_len,
            bytes.len()
        )));
    }

    let data = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    debug!(path = ?path, vectors = count, dimension = dim, "Index read");
    FlatL2Index::from_raw(dim, data)
}

fn read_u32(input: &mut impl Read) -> Result<u32, VectorError> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64(input: &mut impl Read) -> Result<u64, VectorError> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
