//! # Compression Pipeline
//!
//! Frame discovery, the codec adapter and the per-job compression step.
//!
//! ## Key Pieces:
//! - **Frame Discovery**: Lists a directory, keeps entries ending in `.<ext>`, and sorts them
//!   byte-wise by file name. That order is the job index order for the whole run.
//! - **Codec Adapter**: The [`Codec`] trait wraps a single-shot compressor. [`ZlibCodec`] is the
//!   production codec (zlib stream, level 9).
//! - **Job Compression**: [`compress_job`] loads one frame into a private buffer and compresses it.

use crate::common::{
    JobDescriptor, DEFAULT_ARCHIVE_NAME, DEFAULT_FRAME_EXTENSION, DEFAULT_MAX_FILES, DEFAULT_MAX_FRAME_BYTES,
    MAX_WORKERS,
};
use crate::ArchiverError;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What a run does when a job fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// The first failure stops further claims and the run returns an error.
    /// No archive is written.
    #[default]
    FailFast,
    /// Every job runs. Failed jobs are left out of the archive and listed in the report.
    KeepGoing,
}

/// Holds all configuration options for a compression run.
#[derive(Debug, Clone)]
pub struct CompressOptions {
    /// Directory holding the input frames.
    pub input_dir: PathBuf,
    /// Archive path.
    pub output: PathBuf,
    /// Worker pool size. `0` means one worker per logical core.
    pub threads: usize,
    /// Frame suffix without the leading dot.
    pub extension: String,
    /// Job table capacity.
    pub max_files: usize,
    /// Largest frame accepted by the single-pass codec.
    pub max_frame_bytes: u64,
    pub policy: FailurePolicy,
    /// Re-read and check the archive after writing it.
    pub verify: bool,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output: PathBuf::from(DEFAULT_ARCHIVE_NAME),
            threads: 0,
            extension: DEFAULT_FRAME_EXTENSION.to_string(),
            max_files: DEFAULT_MAX_FILES,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            policy: FailurePolicy::FailFast,
            verify: false,
        }
    }
}

impl CompressOptions {
    pub fn new(input_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self { input_dir: input_dir.into(), output: output.into(), ..Self::default() }
    }

    /// Rejects settings that can never produce a run.
    pub fn validate(&self) -> Result<(), ArchiverError> {
        if self.threads > MAX_WORKERS {
            return Err(ArchiverError::InvalidConfig(format!(
                "{} threads requested, at most {MAX_WORKERS} are supported",
                self.threads
            )));
        }
        if self.max_files == 0 {
            return Err(ArchiverError::InvalidConfig("max_files must be at least 1".into()));
        }
        if self.extension.is_empty() || self.extension.contains('/') {
            return Err(ArchiverError::InvalidConfig(format!("invalid frame extension '{}'", self.extension)));
        }
        Ok(())
    }

    /// Resolved pool size: `threads`, or the logical core count when `threads` is `0`.
    pub fn worker_count(&self) -> usize {
        let n = if self.threads == 0 { num_cpus::get() } else { self.threads };
        n.clamp(1, MAX_WORKERS)
    }
}

/// Single-shot compressor used by every worker.
///
/// Implementations must be deterministic: identical input gives identical output.
pub trait Codec: Send + Sync {
    fn compress(&self, input: &[u8]) -> io::Result<Vec<u8>>;
    fn decompress(&self, input: &[u8]) -> io::Result<Vec<u8>>;
}

/// zlib stream codec at a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct ZlibCodec {
    level: Compression,
}

impl ZlibCodec {
    pub fn new(level: u32) -> Self {
        Self { level: Compression::new(level.min(9)) }
    }
}

impl Default for ZlibCodec {
    /// Maximum compression (level 9).
    fn default() -> Self {
        Self { level: Compression::best() }
    }
}

impl Codec for ZlibCodec {
    fn compress(&self, input: &[u8]) -> io::Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(input.len() / 2 + 64), self.level);
        encoder.write_all(input)?;
        encoder.finish()
    }

    fn decompress(&self, input: &[u8]) -> io::Result<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(input);
        let mut out = Vec::with_capacity(input.len());
        decoder.read_to_end(&mut out)?;
        Ok(out)
    }
}

/// Output of one job, stored in that job's result slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedFrame {
    /// Bytes read from the source frame.
    pub input_len: u64,
    /// CRC32 of the source bytes, used by archive verification.
    pub input_crc32: u32,
    pub data: Vec<u8>,
}

impl CompressedFrame {
    pub fn compressed_len(&self) -> usize {
        self.data.len()
    }
}

/// Lists `dir` and returns the absolute paths of all files named `*.{extension}`,
/// sorted byte-wise by file name.
///
/// A file named exactly `.{extension}` is not a frame.
pub fn collect_frames(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, ArchiverError> {
    let meta = fs::metadata(dir).map_err(|e| ArchiverError::io(e, dir))?;
    if !meta.is_dir() {
        return Err(ArchiverError::NotADirectory(dir.to_path_buf()));
    }
    let root = fs::canonicalize(dir).map_err(|e| ArchiverError::io(e, dir))?;
    let suffix = format!(".{extension}");

    let mut names = Vec::new();
    for entry in WalkDir::new(&root).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
            ArchiverError::io(io::Error::from(e), path)
        })?;
        let name = entry.file_name();
        let bytes = name.as_encoded_bytes();
        if bytes.len() > suffix.len() && bytes.ends_with(suffix.as_bytes()) && entry.path().is_file() {
            names.push(name.to_os_string());
        }
    }
    names.sort_by(|a, b| a.as_encoded_bytes().cmp(b.as_encoded_bytes()));

    Ok(names.into_iter().map(|n| root.join(n)).collect())
}

/// Loads one frame into a private buffer sized to the file and compresses it.
///
/// A frame larger than `max_frame_bytes` is rejected before it is read.
pub fn compress_job(
    job: &JobDescriptor,
    codec: &dyn Codec,
    max_frame_bytes: u64,
) -> Result<CompressedFrame, ArchiverError> {
    let path = &job.source_path;
    let file = File::open(path).map_err(|e| ArchiverError::io(e, path))?;
    let size = file.metadata().map_err(|e| ArchiverError::io(e, path))?.len();
    if size > max_frame_bytes {
        return Err(ArchiverError::FrameTooLarge { path: path.clone(), size, max: max_frame_bytes });
    }

    // Bounded read: a frame that grew after the size check still cannot exceed the capacity.
    let mut input = Vec::with_capacity(size as usize);
    file.take(max_frame_bytes + 1)
        .read_to_end(&mut input)
        .map_err(|e| ArchiverError::io(e, path))?;
    if input.len() as u64 > max_frame_bytes {
        return Err(ArchiverError::FrameTooLarge { path: path.clone(), size: input.len() as u64, max: max_frame_bytes });
    }

    let data = codec
        .compress(&input)
        .map_err(|source| ArchiverError::Codec { path: path.clone(), source })?;

    Ok(CompressedFrame { input_len: input.len() as u64, input_crc32: crc32fast::hash(&input), data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn collect_frames_filters_and_sorts_bytewise() {
        let dir = tempdir().unwrap();
        for name in ["b.ppm", "a.ppm", "B.ppm", "notes.txt", ".ppm", "c.ppmx", "a10.ppm", "a2.ppm"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("sub.ppm")).unwrap();

        let frames = collect_frames(dir.path(), "ppm").unwrap();
        let names: Vec<_> = frames.iter().map(|p| p.file_name().unwrap().to_str().unwrap().to_string()).collect();
        assert_eq!(names, ["B.ppm", "a.ppm", "a10.ppm", "a2.ppm", "b.ppm"]);
        assert!(frames.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn collect_frames_rejects_missing_and_non_directories() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("frame.ppm");
        fs::write(&file, b"x").unwrap();

        assert!(matches!(collect_frames(&file, "ppm"), Err(ArchiverError::NotADirectory(_))));
        assert!(matches!(collect_frames(&dir.path().join("missing"), "ppm"), Err(ArchiverError::Io { .. })));
    }

    #[test]
    fn zlib_codec_is_deterministic_and_reversible() {
        let codec = ZlibCodec::default();
        let input: Vec<u8> = (0..4096u32).map(|i| (i % 17) as u8).collect();
        let a = codec.compress(&input).unwrap();
        let b = codec.compress(&input).unwrap();
        assert_eq!(a, b);
        assert!(a.len() < input.len());
        assert_eq!(codec.decompress(&a).unwrap(), input);
    }

    #[test]
    fn decompress_buffer_tracks_payload_size() {
        use rand::Rng;
        let codec = ZlibCodec::default();
        let mut noise = vec![0u8; 64 * 1024];
        rand::thread_rng().fill(&mut noise[..]);

        let payload = codec.compress(&noise).unwrap();
        let out = codec.decompress(&payload).unwrap();
        assert_eq!(out, noise);
        // incompressible input: the payload-sized reservation already fits the output
        assert!(out.capacity() < 2 * payload.len());
    }

    #[test]
    fn compress_job_enforces_input_capacity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.ppm");
        fs::write(&path, vec![7u8; 2048]).unwrap();
        let job = JobDescriptor::new(0, path);
        let codec = ZlibCodec::default();

        let err = compress_job(&job, &codec, 2047).unwrap_err();
        assert!(matches!(err, ArchiverError::FrameTooLarge { size: 2048, max: 2047, .. }));

        let frame = compress_job(&job, &codec, 2048).unwrap();
        assert_eq!(frame.input_len, 2048);
        assert_eq!(frame.input_crc32, crc32fast::hash(&[7u8; 2048]));
        assert_eq!(codec.decompress(&frame.data).unwrap(), vec![7u8; 2048]);
    }

    #[test]
    fn options_validation() {
        let mut opts = CompressOptions::default();
        assert!(opts.validate().is_ok());
        opts.threads = MAX_WORKERS + 1;
        assert!(matches!(opts.validate(), Err(ArchiverError::InvalidConfig(_))));
        opts.threads = 3;
        assert_eq!(opts.worker_count(), 3);
        opts.max_files = 0;
        assert!(opts.validate().is_err());
    }
}
