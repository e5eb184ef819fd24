//! Parallel frame compression.
//!
//! ## Strategy
//!
//! 1. Frames are listed and sorted; the sorted position is the job index.
//! 2. A fixed pool of workers claims indices from a shared cursor and compresses each frame
//!    into that index's result slot.
//! 3. After every worker is joined, the main thread writes the slots in index order.
//!
//! The archive therefore depends only on the sorted input and the codec, never on pool size
//! or scheduling.

mod pool;
mod table;

pub use pool::{run_pool, Claim, PoolConfig, PoolOutcome, WorkDistributor, WorkerStats};
pub use table::{JobTable, ResultSlot, SlotState};

use crate::archive::write_archive_file;
use crate::compress::{collect_frames, Codec, CompressOptions, CompressedFrame, FailurePolicy};
use crate::extract::{verify_archive, ExpectedRecord};
use crate::report::{JobFailure, RunReport};
use crate::ArchiverError;

use tracing::{info, warn};

/// Runs one full compression: discover, compress in parallel, write, optionally verify.
///
/// Under [`FailurePolicy::FailFast`] any job failure returns
/// [`ArchiverError::JobsFailed`] and no archive is written. Under
/// [`FailurePolicy::KeepGoing`] the archive holds the successful frames and the report
/// lists the failures.
pub fn run_parallel_compression(options: &CompressOptions, codec: &dyn Codec) -> Result<RunReport, ArchiverError> {
    options.validate()?;
    let num_workers = options.worker_count();

    let frames = collect_frames(&options.input_dir, &options.extension)?;
    let frames_found = frames.len();
    let mut table = JobTable::populate(frames, options.max_files)?;

    info!(
        frames = frames_found,
        workers = num_workers,
        output = %options.output.display(),
        "compressing frames"
    );

    let outcome = run_pool(
        &mut table,
        codec,
        PoolConfig { workers: num_workers, max_frame_bytes: options.max_frame_bytes, policy: options.policy },
    )?;

    // All workers are joined; slots are final from here on.
    let mut done: Vec<(usize, CompressedFrame)> = Vec::with_capacity(table.len());
    let mut failures = Vec::new();
    let mut first_error = None;
    let mut skipped = 0usize;
    for (job, state) in table.into_entries() {
        match state {
            SlotState::Done(frame) => done.push((job.index, frame)),
            SlotState::Failed(err) => {
                failures.push(JobFailure { index: job.index, path: job.source_path, message: err.to_string() });
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
            SlotState::Pending => skipped += 1,
        }
    }

    if options.policy == FailurePolicy::FailFast {
        if let Some(first) = first_error {
            warn!(
                failed = failures.len(),
                dispensed = outcome.dispensed,
                skipped,
                "run aborted, no archive written"
            );
            return Err(ArchiverError::JobsFailed { failed: failures.len(), first: Box::new(first) });
        }
    }
    // Only a closed distributor leaves slots pending, and only fail-fast closes it.
    debug_assert_eq!(skipped, 0);

    let stats = write_archive_file(&options.output, done.iter().map(|(index, frame)| (*index, frame.data.as_slice())))?;

    let mut verified = false;
    if options.verify {
        let expected: Vec<ExpectedRecord> = done
            .iter()
            .map(|(index, frame)| ExpectedRecord {
                job_index: *index,
                input_len: frame.input_len,
                input_crc32: frame.input_crc32,
            })
            .collect();
        verify_archive(&options.output, &expected, codec)?;
        verified = true;
    }

    let report = RunReport {
        archive: options.output.clone(),
        frames_found,
        records_written: stats.records,
        total_input_bytes: outcome.total_input_bytes,
        total_output_bytes: stats.payload_bytes,
        workers: outcome.workers,
        failures,
        verified,
    };
    info!(
        records = report.records_written,
        dispensed = outcome.dispensed,
        bytes_in = report.total_input_bytes,
        bytes_out = report.total_output_bytes,
        failed = report.failures.len(),
        "archive written"
    );
    Ok(report)
}
