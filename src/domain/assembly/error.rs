use crate::infrastructure::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("batch {batch_index} has {clips} audio clips for {chunks} chunks")]
    ClipCountMismatch {
        batch_index: u32,
        clips: usize,
        chunks: usize,
    },

    #[error("chunk {chunk_index} of batch {batch_index} is {found} Hz, expected {expected} Hz")]
    SampleRateMismatch {
        batch_index: u32,
        chunk_index: usize,
        expected: u32,
        found: u32,
    },

    #[error("WAV encoding failed: {0}")]
    Encoding(#[from] hound::Error),

    #[error("completed batch {batch_index} has no {artifact} on disk")]
    MissingArtifact {
        batch_index: u32,
        artifact: &'static str,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}
