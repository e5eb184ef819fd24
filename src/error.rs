use std::path::PathBuf;

use thiserror::Error;

/// The primary error type for all operations in the `vzip` crate.
#[derive(Debug, Error)]
pub enum ArchiverError {
    /// An I/O error occurred, typically while reading or writing a file.
    /// Includes the path where the error happened.
    #[error("I/O error on path '{}': {source}", .path.display())]
    Io { source: std::io::Error, path: PathBuf },

    /// The input path given on the command line is not a readable directory.
    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// More eligible frames were discovered than the job table can hold.
    #[error("found {found} frames but the job table holds at most {max}")]
    TooManyFiles { found: usize, max: usize },

    /// A frame exceeds the single-pass input capacity of the codec.
    #[error("frame '{}' is {size} bytes, larger than the {max}-byte input capacity", .path.display())]
    FrameTooLarge { path: PathBuf, size: u64, max: u64 },

    /// The compression codec failed on a frame.
    #[error("codec failure on '{}': {source}", .path.display())]
    Codec { path: PathBuf, source: std::io::Error },

    /// A compressed record does not fit the 4-byte length field.
    #[error("record {index} is {len} bytes, which does not fit a 32-bit length field")]
    RecordTooLarge { index: usize, len: usize },

    /// The archive ended in the middle of a record.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    /// The run configuration was rejected before any work started.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A worker thread panicked or poisoned a shared lock.
    #[error("a worker thread panicked")]
    WorkerPanicked,

    /// One or more jobs failed; `first` is the lowest-index failure.
    #[error("{failed} job(s) failed; first failure: {first}")]
    JobsFailed { failed: usize, first: Box<ArchiverError> },

    /// A decompressed record does not match the frame it was built from.
    #[error("verification failed for record {index}: {reason}")]
    VerifyMismatch { index: usize, reason: String },

    /// An error during JSON serialization of listings.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ArchiverError {
    pub(crate) fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        ArchiverError::Io { source, path: path.into() }
    }
}

// Generic IO error conversion that doesn't require a path
impl From<std::io::Error> for ArchiverError {
    fn from(err: std::io::Error) -> Self {
        ArchiverError::Io { source: err, path: PathBuf::new() }
    }
}

impl From<tempfile::PersistError> for ArchiverError {
    fn from(err: tempfile::PersistError) -> Self {
        let path = err.file.path().to_path_buf();
        ArchiverError::Io { source: err.error, path }
    }
}
