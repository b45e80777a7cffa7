use crate::domain::assembly::{ArtifactName, BatchMetadata, Manifest};
use crate::domain::batch::BatchPlan;
use crate::domain::shared::DocumentId;
use crate::infrastructure::storage::{self, StorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub const PLAN_FILE: &str = "plan.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const PLAYLIST_FILE: &str = "playlist.m3u";

/// Output artifacts of a document: plan, batch audio and metadata, manifest and playlist.
///
/// Every write is atomic-or-absent.
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    async fn save_plan(&self, document: &DocumentId, plan: &BatchPlan) -> Result<(), StorageError>;

    async fn load_plan(&self, document: &DocumentId) -> Result<Option<BatchPlan>, StorageError>;

    async fn write_batch_audio(&self, name: &ArtifactName, wav: &[u8]) -> Result<(), StorageError>;

    async fn batch_audio_exists(&self, name: &ArtifactName) -> Result<bool, StorageError>;

    async fn write_batch_metadata(
        &self,
        name: &ArtifactName,
        metadata: &BatchMetadata,
    ) -> Result<(), StorageError>;

    async fn load_batch_metadata(
        &self,
        name: &ArtifactName,
    ) -> Result<Option<BatchMetadata>, StorageError>;

    async fn write_chunk_audio(
        &self,
        name: &ArtifactName,
        chunk_index: usize,
        wav: &[u8],
    ) -> Result<(), StorageError>;

    async fn remove_chunk_audio(&self, name: &ArtifactName) -> Result<(), StorageError>;

    async fn load_manifest(&self, document: &DocumentId) -> Result<Option<Manifest>, StorageError>;

    /// Writes the manifest and the playlist derived from it.
    async fn save_manifest(&self, manifest: &Manifest) -> Result<(), StorageError>;
}

/// Lays artifacts out under `<root>/<document_id>/`.
pub struct FileArtifactRepository {
    root: PathBuf,
}

impl FileArtifactRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn document_dir(&self, document: &DocumentId) -> PathBuf {
        document_dir(&self.root, document)
    }

    pub fn audio_path(&self, name: &ArtifactName) -> PathBuf {
        self.document_dir(&name.document_id).join(name.audio_file())
    }

    fn metadata_path(&self, name: &ArtifactName) -> PathBuf {
        self.document_dir(&name.document_id)
            .join(name.metadata_file())
    }

    fn chunk_dir(&self, name: &ArtifactName) -> PathBuf {
        self.document_dir(&name.document_id).join(name.chunk_dir())
    }
}

pub fn document_dir(root: &Path, document: &DocumentId) -> PathBuf {
    root.join(document.as_str())
}

pub fn plan_path(root: &Path, document: &DocumentId) -> PathBuf {
    document_dir(root, document).join(PLAN_FILE)
}

pub fn manifest_path(root: &Path, document: &DocumentId) -> PathBuf {
    document_dir(root, document).join(MANIFEST_FILE)
}

#[async_trait]
impl ArtifactRepository for FileArtifactRepository {
    async fn save_plan(&self, document: &DocumentId, plan: &BatchPlan) -> Result<(), StorageError> {
        storage::write_json(&plan_path(&self.root, document), plan).await
    }

    async fn load_plan(&self, document: &DocumentId) -> Result<Option<BatchPlan>, StorageError> {
        storage::read_json(&plan_path(&self.root, document)).await
    }

    async fn write_batch_audio(&self, name: &ArtifactName, wav: &[u8]) -> Result<(), StorageError> {
        let path = self.audio_path(name);
        storage::write_atomic(&path, wav).await?;
        tracing::debug!(
            batch_index = name.batch_index,
            path = %path.display(),
            size_bytes = wav.len(),
            "Batch audio written"
        );
        Ok(())
    }

    async fn batch_audio_exists(&self, name: &ArtifactName) -> Result<bool, StorageError> {
        let path = self.audio_path(name);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|source| StorageError::Io { path, source })
    }

    async fn write_batch_metadata(
        &self,
        name: &ArtifactName,
        metadata: &BatchMetadata,
    ) -> Result<(), StorageError> {
        storage::write_json(&self.metadata_path(name), metadata).await
    }

    async fn load_batch_metadata(
        &self,
        name: &ArtifactName,
    ) -> Result<Option<BatchMetadata>, StorageError> {
        storage::read_json(&self.metadata_path(name)).await
    }

    async fn write_chunk_audio(
        &self,
        name: &ArtifactName,
        chunk_index: usize,
        wav: &[u8],
    ) -> Result<(), StorageError> {
        let path = self
            .chunk_dir(name)
            .join(ArtifactName::chunk_file(chunk_index));
        storage::write_atomic(&path, wav).await
    }

    async fn remove_chunk_audio(&self, name: &ArtifactName) -> Result<(), StorageError> {
        storage::remove_dir_if_exists(&self.chunk_dir(name)).await
    }

    async fn load_manifest(&self, document: &DocumentId) -> Result<Option<Manifest>, StorageError> {
        storage::read_json(&manifest_path(&self.root, document)).await
    }

    async fn save_manifest(&self, manifest: &Manifest) -> Result<(), StorageError> {
        let dir = self.document_dir(&manifest.document_id);
        storage::write_json(&dir.join(MANIFEST_FILE), manifest).await?;
        storage::write_atomic(&dir.join(PLAYLIST_FILE), manifest.to_m3u().as_bytes()).await?;

        tracing::debug!(
            document_id = %manifest.document_id,
            entries = manifest.entries.len(),
            total_batches = manifest.total_batches,
            "Manifest written"
        );
        Ok(())
    }
}
