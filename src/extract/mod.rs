//! # Extraction Module
//!
//! Reading side of the frame archive: listing records, extracting them back to frame files,
//! and checking an archive against the frames it was built from.

use crate::archive::ArchiveReader;
use crate::compress::Codec;
use crate::ArchiverError;

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Listing entry for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordInfo {
    pub index: usize,
    pub compressed_len: usize,
    pub decompressed_len: usize,
}

/// Expected content of one record, captured while compressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedRecord {
    /// Job index of the frame the record was built from.
    pub job_index: usize,
    pub input_len: u64,
    pub input_crc32: u32,
}

/// Decompresses every record and returns its sizes.
pub fn list_records(archive: &Path, codec: &dyn Codec) -> Result<Vec<RecordInfo>, ArchiverError> {
    let mut entries = Vec::new();
    for record in ArchiveReader::open(archive)? {
        let record = record?;
        let data = decode(codec, archive, &record.payload, record.index)?;
        entries.push(RecordInfo {
            index: record.index,
            compressed_len: record.payload.len(),
            decompressed_len: data.len(),
        });
    }
    Ok(entries)
}

/// Writes each record to `out_dir/frame_{index:06}.{extension}`, creating `out_dir` if needed.
///
/// Returns the written paths in record order.
pub fn extract_records(
    archive: &Path,
    out_dir: &Path,
    extension: &str,
    codec: &dyn Codec,
) -> Result<Vec<PathBuf>, ArchiverError> {
    fs::create_dir_all(out_dir).map_err(|e| ArchiverError::io(e, out_dir))?;

    let mut written = Vec::new();
    for record in ArchiveReader::open(archive)? {
        let record = record?;
        let data = decode(codec, archive, &record.payload, record.index)?;
        let path = out_dir.join(format!("frame_{:06}.{extension}", record.index));
        fs::write(&path, &data).map_err(|e| ArchiverError::io(e, &path))?;
        debug!(index = record.index, path = %path.display(), bytes = data.len(), "record extracted");
        written.push(path);
    }
    Ok(written)
}

/// Re-reads `archive` and checks that it holds exactly `expected`, in order.
pub fn verify_archive(archive: &Path, expected: &[ExpectedRecord], codec: &dyn Codec) -> Result<(), ArchiverError> {
    let mut count = 0usize;
    for record in ArchiveReader::open(archive)? {
        let record = record?;
        let Some(want) = expected.get(record.index) else {
            return Err(ArchiverError::VerifyMismatch {
                index: record.index,
                reason: format!("archive holds more than the {} expected records", expected.len()),
            });
        };
        let data = decode(codec, archive, &record.payload, record.index)?;
        if data.len() as u64 != want.input_len {
            return Err(ArchiverError::VerifyMismatch {
                index: record.index,
                reason: format!("frame {} decompressed to {} bytes, expected {}", want.job_index, data.len(), want.input_len),
            });
        }
        if crc32fast::hash(&data) != want.input_crc32 {
            return Err(ArchiverError::VerifyMismatch {
                index: record.index,
                reason: format!("frame {} checksum mismatch", want.job_index),
            });
        }
        count += 1;
    }
    if count != expected.len() {
        return Err(ArchiverError::VerifyMismatch {
            index: count,
            reason: format!("archive holds {count} records, expected {}", expected.len()),
        });
    }
    Ok(())
}

fn decode(codec: &dyn Codec, archive: &Path, payload: &[u8], index: usize) -> Result<Vec<u8>, ArchiverError> {
    codec.decompress(payload).map_err(|e| {
        ArchiverError::CorruptArchive(format!("record {index} in '{}' does not decompress: {e}", archive.display()))
    })
}
