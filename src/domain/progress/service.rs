use super::error::ProgressServiceError;
use super::model::{ActivityBoard, BatchProgress, ProgressSnapshot};
use crate::domain::assembly::Manifest;
use crate::domain::batch::BatchStatus;
use crate::domain::shared::DocumentId;
use crate::infrastructure::repositories::{ArtifactRepository, CheckpointRepository};
use async_trait::async_trait;
use std::sync::Arc;

/// Reads progress from the persisted checkpoint and plan. Never writes, so it is safe to run
/// next to an engine working on the same document.
pub struct ProgressService {
    checkpoints: Arc<dyn CheckpointRepository>,
    artifacts: Arc<dyn ArtifactRepository>,
    activity: ActivityBoard,
}

impl ProgressService {
    pub fn new(
        checkpoints: Arc<dyn CheckpointRepository>,
        artifacts: Arc<dyn ArtifactRepository>,
        activity: ActivityBoard,
    ) -> Self {
        Self {
            checkpoints,
            artifacts,
            activity,
        }
    }
}

#[async_trait]
pub trait ProgressServiceApi: Send + Sync {
    /// Processed/total chunks, completed/total batches and per-batch status of a document
    async fn progress(&self, document_id: &str) -> Result<ProgressSnapshot, ProgressServiceError>;

    /// Completed batch artifacts in playback order
    async fn manifest(&self, document_id: &str) -> Result<Manifest, ProgressServiceError>;
}

#[async_trait]
impl ProgressServiceApi for ProgressService {
    async fn progress(&self, document_id: &str) -> Result<ProgressSnapshot, ProgressServiceError> {
        let document = parse_document(document_id)?;

        let record = self.checkpoints.load(&document).await?.ok_or_else(|| {
            ProgressServiceError::NotFound(format!("No checkpoint for document '{}'", document))
        })?;
        let plan = self.artifacts.load_plan(&document).await?;
        let active = self.activity.get(&document).await;

        let batches: Vec<BatchProgress> = plan
            .iter()
            .flat_map(|plan| plan.iter())
            .map(|batch| {
                let status = if record.is_completed(batch.index) {
                    BatchStatus::Completed
                } else {
                    match active {
                        Some((index, status)) if index == batch.index => status,
                        _ => BatchStatus::Pending,
                    }
                };
                BatchProgress {
                    index: batch.index,
                    chunk_count: batch.chunk_count(),
                    size: batch.size,
                    status,
                    first_position: batch.first_position,
                    last_position: batch.last_position,
                }
            })
            .collect();

        let next_batch = match &plan {
            Some(plan) => plan
                .iter()
                .map(|b| b.index)
                .find(|index| !record.is_completed(*index)),
            None => (1..=record.total_batches).find(|index| !record.is_completed(*index)),
        };

        let percent_complete = if record.total_chunks == 0 {
            if record.is_complete() {
                100.0
            } else {
                0.0
            }
        } else {
            (record.processed_chunks as f64 / record.total_chunks as f64 * 1000.0).round() / 10.0
        };

        tracing::debug!(
            document_id = %document,
            processed_chunks = record.processed_chunks,
            total_chunks = record.total_chunks,
            "Progress requested"
        );

        Ok(ProgressSnapshot {
            document_id: document,
            run_date: record.run_date,
            processed_chunks: record.processed_chunks,
            total_chunks: record.total_chunks,
            completed_batches: record.completed_batches.len(),
            total_batches: record.total_batches,
            last_completed_batch: record.last_completed_batch(),
            next_batch,
            percent_complete,
            is_complete: record.is_complete(),
            updated_at: record.updated_at,
            batches,
        })
    }

    async fn manifest(&self, document_id: &str) -> Result<Manifest, ProgressServiceError> {
        let document = parse_document(document_id)?;
        self.artifacts.load_manifest(&document).await?.ok_or_else(|| {
            ProgressServiceError::NotFound(format!("No manifest for document '{}'", document))
        })
    }
}

fn parse_document(raw: &str) -> Result<DocumentId, ProgressServiceError> {
    DocumentId::parse(raw).map_err(|e| ProgressServiceError::Invalid(e.to_string()))
}
