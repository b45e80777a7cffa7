use crate::domain::checkpoint::CheckpointRecord;
use crate::domain::shared::DocumentId;
use crate::infrastructure::storage::{self, StorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub const CHECKPOINT_FILE: &str = "checkpoint.json";

/// Durable home of checkpoint records, one per document.
///
/// `save` must be atomic-or-absent: a reader never observes a partially written record.
#[async_trait]
pub trait CheckpointRepository: Send + Sync {
    async fn load(&self, document: &DocumentId) -> Result<Option<CheckpointRecord>, StorageError>;

    async fn save(&self, record: &CheckpointRecord) -> Result<(), StorageError>;
}

/// Stores `<root>/<document_id>/checkpoint.json`.
pub struct FileCheckpointRepository {
    root: PathBuf,
}

impl FileCheckpointRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, document: &DocumentId) -> PathBuf {
        checkpoint_path(&self.root, document)
    }
}

pub fn checkpoint_path(root: &Path, document: &DocumentId) -> PathBuf {
    root.join(document.as_str()).join(CHECKPOINT_FILE)
}

#[async_trait]
impl CheckpointRepository for FileCheckpointRepository {
    async fn load(&self, document: &DocumentId) -> Result<Option<CheckpointRecord>, StorageError> {
        storage::read_json(&self.path_for(document)).await
    }

    async fn save(&self, record: &CheckpointRecord) -> Result<(), StorageError> {
        let path = self.path_for(&record.document_id);
        storage::write_json(&path, record).await?;

        tracing::debug!(
            document_id = %record.document_id,
            processed_chunks = record.processed_chunks,
            completed_batches = record.completed_batches.len(),
            path = %path.display(),
            "Checkpoint persisted"
        );
        Ok(())
    }
}
