//! Common utilities and types module.
// Shared structs, constants, etc.

use std::path::PathBuf;

/// Default archive name, written fresh in the working directory each run.
pub const DEFAULT_ARCHIVE_NAME: &str = "video.vzip";

/// Default frame suffix (without the dot).
pub const DEFAULT_FRAME_EXTENSION: &str = "ppm";

/// Default job table capacity.
pub const DEFAULT_MAX_FILES: usize = 1500;

/// Default single-pass input capacity: 1 MiB.
pub const DEFAULT_MAX_FRAME_BYTES: u64 = 1024 * 1024;

/// Hard upper bound on the worker pool size.
pub const MAX_WORKERS: usize = 64;

/// Size of the native-endian length prefix in front of each record.
pub const RECORD_LEN_BYTES: usize = 4;

/// One unit of work: a frame addressed by its sorted position.
///
/// Created once while the job table is populated and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    /// 0-based position in sorted input order.
    pub index: usize,
    /// Absolute path of the source frame.
    pub source_path: PathBuf,
}

impl JobDescriptor {
    pub fn new(index: usize, source_path: PathBuf) -> Self {
        Self { index, source_path }
    }
}
