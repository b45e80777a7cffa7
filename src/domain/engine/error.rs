use crate::domain::assembly::AssemblyError;
use crate::domain::batch::PlanError;
use crate::domain::checkpoint::CheckpointError;
use crate::domain::synthesis::SynthesisError;
use crate::infrastructure::storage::StorageError;

/// Failures that end a run. Variants raised once the checkpoint is bound carry the last completed batch and
/// the batch total so an operator knows how much output can be trusted.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("cannot plan batches: {0}")]
    Plan(#[from] PlanError),

    #[error("checkpoint does not match the current document: {0}")]
    Inconsistent(#[source] CheckpointError),

    #[error("stored plan differs from the current one ({stored_batches} vs {planned_batches} batches) while {completed} batch(es) are already complete")]
    PlanChanged {
        stored_batches: u32,
        planned_batches: u32,
        completed: usize,
        last_completed_batch: Option<u32>,
        total_batches: u32,
    },

    #[error("checkpoint unavailable: {0}")]
    Checkpoint(#[source] CheckpointError),

    #[error("artifact storage failed: {source}")]
    Storage {
        #[source]
        source: StorageError,
        last_completed_batch: Option<u32>,
        total_batches: u32,
    },

    #[error("manifest could not be rebuilt: {source}")]
    Manifest {
        #[source]
        source: AssemblyError,
        last_completed_batch: Option<u32>,
        total_batches: u32,
    },

    #[error("batch {batch_index} failed at chunk {chunk_index} after {attempts} attempt(s): {source}")]
    BatchFailed {
        batch_index: u32,
        chunk_index: usize,
        attempts: u32,
        #[source]
        source: SynthesisError,
        last_completed_batch: Option<u32>,
        total_batches: u32,
    },

    #[error("batch {batch_index} could not be assembled: {source}")]
    Assembly {
        batch_index: u32,
        #[source]
        source: AssemblyError,
        last_completed_batch: Option<u32>,
        total_batches: u32,
    },

    #[error("checkpoint for batch {batch_index} could not be persisted: {source}")]
    Persistence {
        batch_index: u32,
        #[source]
        source: CheckpointError,
        last_completed_batch: Option<u32>,
        total_batches: u32,
    },
}

impl EngineError {
    pub(crate) fn from_checkpoint(err: CheckpointError) -> Self {
        if err.is_inconsistency() {
            EngineError::Inconsistent(err)
        } else {
            EngineError::Checkpoint(err)
        }
    }

    pub fn last_completed_batch(&self) -> Option<u32> {
        match self {
            EngineError::PlanChanged {
                last_completed_batch,
                ..
            }
            | EngineError::Storage {
                last_completed_batch,
                ..
            }
            | EngineError::Manifest {
                last_completed_batch,
                ..
            }
            | EngineError::BatchFailed {
                last_completed_batch,
                ..
            }
            | EngineError::Assembly {
                last_completed_batch,
                ..
            }
            | EngineError::Persistence {
                last_completed_batch,
                ..
            } => *last_completed_batch,
            _ => None,
        }
    }

    pub fn total_batches(&self) -> Option<u32> {
        match self {
            EngineError::PlanChanged { total_batches, .. }
            | EngineError::Storage { total_batches, .. }
            | EngineError::Manifest { total_batches, .. }
            | EngineError::BatchFailed { total_batches, .. }
            | EngineError::Assembly { total_batches, .. }
            | EngineError::Persistence { total_batches, .. } => Some(*total_batches),
            _ => None,
        }
    }
}
