//! Work distributor and worker pool.
//!
//! The distributor hands out `(descriptor, &mut slot)` pairs from a mutex-guarded cursor.
//! Each pair is yielded once, so exactly one worker can write a given slot, and the borrow
//! on the job table ends only when every worker has been joined.

use std::iter::Zip;
use std::slice;
use std::sync::Mutex;
use std::thread;

use tracing::{debug, warn};

use super::table::{JobTable, ResultSlot};
use crate::common::JobDescriptor;
use crate::compress::{compress_job, Codec, FailurePolicy};
use crate::ArchiverError;

/// A claimed job: its descriptor and exclusive write access to its slot.
pub struct Claim<'t> {
    pub job: &'t JobDescriptor,
    pub slot: &'t mut ResultSlot,
}

struct Cursor<'t> {
    pending: Zip<slice::Iter<'t, JobDescriptor>, slice::IterMut<'t, ResultSlot>>,
    next_index: usize,
    total_input_bytes: u64,
    closed: bool,
}

/// Shared fetch-and-increment allocator over a job table.
///
/// All state sits behind one lock and every critical section is O(1).
pub struct WorkDistributor<'t> {
    cursor: Mutex<Cursor<'t>>,
    file_count: usize,
}

impl<'t> WorkDistributor<'t> {
    pub fn new(table: &'t mut JobTable) -> Self {
        let file_count = table.len();
        let (jobs, slots) = table.split_mut();
        Self {
            cursor: Mutex::new(Cursor {
                pending: jobs.iter().zip(slots.iter_mut()),
                next_index: 0,
                total_input_bytes: 0,
                closed: false,
            }),
            file_count,
        }
    }

    /// Returns the next unclaimed job, or `None` once every index has been dispensed
    /// or the distributor was closed.
    pub fn claim(&self) -> Result<Option<Claim<'t>>, ArchiverError> {
        let mut cursor = self.cursor.lock().map_err(|_| ArchiverError::WorkerPanicked)?;
        if cursor.closed || cursor.next_index >= self.file_count {
            return Ok(None);
        }
        let Some((job, slot)) = cursor.pending.next() else {
            return Ok(None);
        };
        debug_assert_eq!(job.index, cursor.next_index);
        cursor.next_index += 1;
        Ok(Some(Claim { job, slot }))
    }

    /// Adds a finished job's input size to the run total.
    pub fn add_input_bytes(&self, bytes: u64) -> Result<(), ArchiverError> {
        let mut cursor = self.cursor.lock().map_err(|_| ArchiverError::WorkerPanicked)?;
        cursor.total_input_bytes += bytes;
        Ok(())
    }

    /// Stops dispensing. Jobs already claimed still complete.
    pub fn close(&self) -> Result<(), ArchiverError> {
        let mut cursor = self.cursor.lock().map_err(|_| ArchiverError::WorkerPanicked)?;
        cursor.closed = true;
        Ok(())
    }

    /// Consumes the distributor, releasing the table borrow. Returns `(dispensed, total_input_bytes)`.
    pub fn into_totals(self) -> Result<(usize, u64), ArchiverError> {
        let cursor = self.cursor.into_inner().map_err(|_| ArchiverError::WorkerPanicked)?;
        Ok((cursor.next_index, cursor.total_input_bytes))
    }
}

/// Per-worker counters, reported after the join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub jobs: usize,
    pub failed: usize,
    pub bytes_in: u64,
}

/// Result of one pool run.
#[derive(Debug, Clone, Default)]
pub struct PoolOutcome {
    /// Number of indices handed out.
    pub dispensed: usize,
    /// Input bytes of all successful jobs.
    pub total_input_bytes: u64,
    pub workers: Vec<WorkerStats>,
}

/// Pool configuration.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub workers: usize,
    pub max_frame_bytes: u64,
    pub policy: FailurePolicy,
}

/// Runs `config.workers` threads over `table` and joins them all before returning.
///
/// Every slot that was claimed holds its outcome afterwards. Under
/// [`FailurePolicy::FailFast`] the first failure closes the distributor, so later slots
/// may stay pending.
pub fn run_pool(table: &mut JobTable, codec: &dyn Codec, config: PoolConfig) -> Result<PoolOutcome, ArchiverError> {
    let distributor = WorkDistributor::new(table);

    let joined: Vec<thread::Result<Result<WorkerStats, ArchiverError>>> = thread::scope(|s| {
        let distributor = &distributor;
        let handles: Vec<_> = (0..config.workers.max(1))
            .map(|worker_id| s.spawn(move || worker_loop(worker_id, distributor, codec, config)))
            .collect();
        // join barrier
        handles.into_iter().map(|h| h.join()).collect()
    });

    let mut workers = Vec::with_capacity(joined.len());
    for res in joined {
        match res {
            Ok(Ok(stats)) => workers.push(stats),
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(ArchiverError::WorkerPanicked),
        }
    }

    let (dispensed, total_input_bytes) = distributor.into_totals()?;
    Ok(PoolOutcome { dispensed, total_input_bytes, workers })
}

fn worker_loop(
    worker_id: usize,
    distributor: &WorkDistributor<'_>,
    codec: &dyn Codec,
    config: PoolConfig,
) -> Result<WorkerStats, ArchiverError> {
    let mut stats = WorkerStats { worker_id, ..WorkerStats::default() };

    while let Some(Claim { job, slot }) = distributor.claim()? {
        let outcome = compress_job(job, codec, config.max_frame_bytes);
        match &outcome {
            Ok(frame) => {
                distributor.add_input_bytes(frame.input_len)?;
                stats.jobs += 1;
                stats.bytes_in += frame.input_len;
                debug!(
                    worker = worker_id,
                    index = job.index,
                    path = %job.source_path.display(),
                    bytes_in = frame.input_len,
                    bytes_out = frame.compressed_len(),
                    "frame compressed"
                );
            }
            Err(e) => {
                stats.failed += 1;
                warn!(worker = worker_id, index = job.index, error = %e, "frame failed");
                if config.policy == FailurePolicy::FailFast {
                    distributor.close()?;
                }
            }
        }
        slot.fill(outcome);
    }

    debug!(worker = worker_id, jobs = stats.jobs, failed = stats.failed, "worker finished");
    Ok(stats)
}
