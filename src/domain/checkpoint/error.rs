use crate::domain::shared::DocumentId;
use crate::infrastructure::storage::StorageError;

/// Failures of the checkpoint store. Everything except `Storage` means the persisted record
/// does not describe the current plan.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint references batch {index} but the plan has {total_batches} batches")]
    UnknownBatch { index: u32, total_batches: u32 },

    #[error("checkpoint was written for {recorded} chunks but the plan has {planned}")]
    ChunkCountMismatch { recorded: usize, planned: usize },

    #[error("checkpoint was written for {recorded} batches but the plan has {planned}")]
    BatchCountMismatch { recorded: u32, planned: u32 },

    #[error("checkpoint counts {recorded} processed chunks but its completed batches hold {expected}")]
    ProcessedMismatch { recorded: usize, expected: usize },

    #[error("checkpoint belongs to document '{found}', expected '{expected}'")]
    DocumentMismatch {
        expected: DocumentId,
        found: DocumentId,
    },

    #[error("checkpoint persistence failed: {0}")]
    Storage(#[from] StorageError),
}

impl CheckpointError {
    /// True when the record and the plan disagree, as opposed to an I/O failure.
    pub fn is_inconsistency(&self) -> bool {
        !matches!(self, CheckpointError::Storage(_))
    }
}
