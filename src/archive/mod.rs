//! # Frame Archive Format
//!
//! An archive is a plain sequence of records with no header, footer or checksum:
//!
//! ```text
//! [u32 length, native byte order][length bytes of zlib stream]   x record count
//! ```
//!
//! Record order is the sorted input order. A reader walks records front to back; each
//! length field gives the exact size of the payload that follows.

use crate::common::RECORD_LEN_BYTES;
use crate::ArchiverError;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Sequential record writer.
pub struct ArchiveWriter<W: Write> {
    writer: W,
    records: usize,
    payload_bytes: u64,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, records: 0, payload_bytes: 0 }
    }

    /// Appends one record. `index` is only used for error reporting.
    pub fn write_record(&mut self, index: usize, payload: &[u8]) -> Result<(), ArchiverError> {
        let len = u32::try_from(payload.len())
            .map_err(|_| ArchiverError::RecordTooLarge { index, len: payload.len() })?;
        self.writer.write_all(&len.to_ne_bytes())?;
        self.writer.write_all(payload)?;
        self.records += 1;
        self.payload_bytes += payload.len() as u64;
        Ok(())
    }

    pub fn records(&self) -> usize {
        self.records
    }

    /// Sum of payload sizes written so far, excluding length fields.
    pub fn payload_bytes(&self) -> u64 {
        self.payload_bytes
    }

    /// Flushes and returns the underlying writer.
    pub fn finish(mut self) -> Result<W, ArchiverError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Totals returned by [`write_archive_file`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub records: usize,
    pub payload_bytes: u64,
}

/// Writes `records` as a fresh archive at `path`.
///
/// Data goes to a temporary file in the destination directory that replaces `path` only
/// once every record is written, so a failed write leaves no truncated archive behind.
/// A replaced archive keeps its permissions; a new one is created 0644 on Unix.
pub fn write_archive_file<'a, I>(path: &Path, records: I) -> Result<ArchiveStats, ArchiverError>
where
    I: IntoIterator<Item = (usize, &'a [u8])>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir).map_err(|e| ArchiverError::io(e, dir))?;

    let (writer, stats) = write_records(BufWriter::new(tmp), path, records)?;
    let tmp = writer.into_inner().map_err(|e| ArchiverError::io(e.into_error(), path))?;
    apply_permissions(&tmp, path)?;
    tmp.persist(path)?;
    Ok(stats)
}

/// Streams `records` into `writer`. I/O failures are reported against `path`.
fn write_records<'a, W, I>(writer: W, path: &Path, records: I) -> Result<(W, ArchiveStats), ArchiverError>
where
    W: Write,
    I: IntoIterator<Item = (usize, &'a [u8])>,
{
    let at_path = |err: ArchiverError| match err {
        ArchiverError::Io { source, .. } => ArchiverError::io(source, path),
        other => other,
    };

    let mut writer = ArchiveWriter::new(writer);
    for (index, payload) in records {
        writer.write_record(index, payload).map_err(at_path)?;
    }
    let stats = ArchiveStats { records: writer.records(), payload_bytes: writer.payload_bytes() };
    let inner = writer.finish().map_err(at_path)?;
    Ok((inner, stats))
}

// Temp files are created 0600. The process umask is not consulted.
#[cfg(unix)]
fn apply_permissions(tmp: &NamedTempFile, target: &Path) -> Result<(), ArchiverError> {
    use std::os::unix::fs::PermissionsExt;
    let perms = match std::fs::metadata(target) {
        Ok(meta) => meta.permissions(),
        Err(_) => std::fs::Permissions::from_mode(0o644),
    };
    tmp.as_file().set_permissions(perms).map_err(|e| ArchiverError::io(e, tmp.path()))
}

#[cfg(not(unix))]
fn apply_permissions(_tmp: &NamedTempFile, _target: &Path) -> Result<(), ArchiverError> {
    Ok(())
}

/// One record read back from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Position of the record in the archive.
    pub index: usize,
    pub payload: Vec<u8>,
}

/// Sequential record reader. Yields records until a clean end of file.
pub struct ArchiveReader<R: Read> {
    reader: R,
    next_index: usize,
    done: bool,
}

impl ArchiveReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, ArchiverError> {
        let file = File::open(path).map_err(|e| ArchiverError::io(e, path))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> ArchiveReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, next_index: 0, done: false }
    }

    fn read_record(&mut self) -> Result<Option<Record>, ArchiverError> {
        let mut len_buf = [0u8; RECORD_LEN_BYTES];
        let got = read_full(&mut self.reader, &mut len_buf)?;
        if got == 0 {
            return Ok(None);
        }
        if got < RECORD_LEN_BYTES {
            return Err(ArchiverError::CorruptArchive(format!(
                "record {} length field truncated after {got} bytes",
                self.next_index
            )));
        }

        let len = u32::from_ne_bytes(len_buf) as usize;
        // Grow with the data actually present rather than trusting the length field.
        let mut payload = Vec::new();
        (&mut self.reader).take(len as u64).read_to_end(&mut payload)?;
        if payload.len() < len {
            return Err(ArchiverError::CorruptArchive(format!(
                "record {} declares {len} bytes but only {} remain",
                self.next_index,
                payload.len()
            )));
        }

        let record = Record { index: self.next_index, payload };
        self.next_index += 1;
        Ok(Some(record))
    }
}

impl<R: Read> Iterator for ArchiveReader<R> {
    type Item = Result<Record, ArchiverError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Reads until `buf` is full or EOF; returns the number of bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
