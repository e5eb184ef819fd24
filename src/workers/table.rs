//! Job table: one descriptor and one result slot per frame, addressed by sorted index.

use std::path::PathBuf;

use crate::common::JobDescriptor;
use crate::compress::CompressedFrame;
use crate::ArchiverError;

/// State of a single result slot.
#[derive(Debug, Default)]
pub enum SlotState {
    /// Not claimed, or claimed and still being compressed.
    #[default]
    Pending,
    Done(CompressedFrame),
    Failed(ArchiverError),
}

/// Storage reserved for one job's compressed output.
///
/// Only the worker holding the `&mut` handed out by the distributor can write it.
#[derive(Debug, Default)]
pub struct ResultSlot {
    state: SlotState,
}

impl ResultSlot {
    /// Stores the job outcome. A slot is filled once; a second fill is a logic error.
    pub fn fill(&mut self, outcome: Result<CompressedFrame, ArchiverError>) {
        debug_assert!(matches!(self.state, SlotState::Pending), "result slot filled twice");
        self.state = match outcome {
            Ok(frame) => SlotState::Done(frame),
            Err(e) => SlotState::Failed(e),
        };
    }

    #[cfg(test)]
    fn state(&self) -> &SlotState {
        &self.state
    }

    pub fn into_state(self) -> SlotState {
        self.state
    }
}

/// Fixed-length table of (descriptor, slot) pairs in sorted input order.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<JobDescriptor>,
    slots: Vec<ResultSlot>,
}

impl JobTable {
    /// Builds the table from an already sorted path list.
    ///
    /// Fails when `paths` holds more than `max_files` entries, before any slot is allocated.
    pub fn populate(paths: Vec<PathBuf>, max_files: usize) -> Result<Self, ArchiverError> {
        if paths.len() > max_files {
            return Err(ArchiverError::TooManyFiles { found: paths.len(), max: max_files });
        }
        let jobs: Vec<JobDescriptor> = paths
            .into_iter()
            .enumerate()
            .map(|(index, path)| JobDescriptor::new(index, path))
            .collect();
        let slots = jobs.iter().map(|_| ResultSlot::default()).collect();
        Ok(Self { jobs, slots })
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Descriptor/slot pairs in index order.
    #[cfg(test)]
    fn iter(&self) -> impl Iterator<Item = (&JobDescriptor, &ResultSlot)> {
        self.jobs.iter().zip(self.slots.iter())
    }

    /// Read-only descriptors alongside exclusive access to every slot.
    pub(crate) fn split_mut(&mut self) -> (&[JobDescriptor], &mut [ResultSlot]) {
        (&self.jobs, &mut self.slots)
    }

    pub fn into_entries(self) -> impl Iterator<Item = (JobDescriptor, SlotState)> {
        self.jobs.into_iter().zip(self.slots.into_iter().map(ResultSlot::into_state))
    }
}
