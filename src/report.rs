//! Run summary produced after the archive is written.

use std::fmt;
use std::path::PathBuf;

use crate::workers::WorkerStats;

/// A job that did not make it into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub index: usize,
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.index, self.path.display(), self.message)
    }
}

/// Aggregate outcome of one compression run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub archive: PathBuf,
    /// Eligible frames discovered in the input directory.
    pub frames_found: usize,
    pub records_written: usize,
    pub total_input_bytes: u64,
    /// Sum of record payloads, excluding length prefixes.
    pub total_output_bytes: u64,
    pub workers: Vec<WorkerStats>,
    pub failures: Vec<JobFailure>,
    pub verified: bool,
}

impl RunReport {
    /// `(in - out) / in` as a percentage, or `None` when no input bytes were read.
    pub fn compression_rate(&self) -> Option<f64> {
        compression_rate(self.total_input_bytes, self.total_output_bytes)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The console summary line.
    pub fn summary_line(&self) -> String {
        match self.compression_rate() {
            Some(rate) => format!("Compression rate: {rate:.2}%"),
            None => "Compression rate: n/a (no input bytes)".to_string(),
        }
    }
}

/// Percentage saved by compression. Negative when the output grew.
pub fn compression_rate(total_in: u64, total_out: u64) -> Option<f64> {
    if total_in == 0 {
        return None;
    }
    Some(100.0 * (total_in as f64 - total_out as f64) / total_in as f64)
}
