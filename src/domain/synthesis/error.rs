use super::model::PartialResults;
use std::time::Duration;

/// Failure of a single synthesis call, as classified by the provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("transient synthesis failure: {0}")]
    Transient(String),
    #[error("permanent synthesis failure: {0}")]
    Permanent(String),
    #[error("synthesis timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl SynthesisError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SynthesisError::Transient(_) | SynthesisError::Timeout(_))
    }
}

/// Failure of a whole batch. Both variants carry the clips that did complete.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("chunk {chunk_index} of batch {batch_index} failed after {attempts} attempt(s): {source}")]
    ChunkFailed {
        batch_index: u32,
        chunk_index: usize,
        attempts: u32,
        #[source]
        source: SynthesisError,
        partial: PartialResults,
    },

    #[error("batch {batch_index} abandoned with {} chunk(s) synthesized", .partial.len())]
    Abandoned {
        batch_index: u32,
        partial: PartialResults,
    },
}

impl DispatchError {
    pub fn partial(&self) -> &PartialResults {
        match self {
            DispatchError::ChunkFailed { partial, .. } | DispatchError::Abandoned { partial, .. } => {
                partial
            }
        }
    }
}
