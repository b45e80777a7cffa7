use super::error::CheckpointError;
use super::model::CheckpointRecord;
use crate::domain::batch::BatchPlan;
use crate::domain::shared::DocumentId;
use crate::infrastructure::repositories::CheckpointRepository;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

/// Single-writer view over a document's checkpoint.
///
/// The in-memory record only changes after the repository has accepted the new version, so a
/// failed save leaves both copies at the last durable state.
pub struct CheckpointStore {
    repo: Arc<dyn CheckpointRepository>,
    record: CheckpointRecord,
    persisted: bool,
}

impl CheckpointStore {
    /// Load the persisted record, or start a fresh one dated `run_date` if none exists.
    pub async fn load(
        repo: Arc<dyn CheckpointRepository>,
        document: &DocumentId,
        run_date: NaiveDate,
    ) -> Result<Self, CheckpointError> {
        match repo.load(document).await? {
            Some(record) => {
                if &record.document_id != document {
                    return Err(CheckpointError::DocumentMismatch {
                        expected: document.clone(),
                        found: record.document_id,
                    });
                }
                tracing::info!(
                    document_id = %document,
                    run_date = %record.run_date,
                    processed_chunks = record.processed_chunks,
                    total_chunks = record.total_chunks,
                    completed_batches = record.completed_batches.len(),
                    total_batches = record.total_batches,
                    "Checkpoint loaded"
                );
                Ok(Self {
                    repo,
                    record,
                    persisted: true,
                })
            }
            None => {
                tracing::info!(document_id = %document, run_date = %run_date, "No checkpoint found, starting fresh");
                Ok(Self {
                    repo,
                    record: CheckpointRecord::fresh(document.clone(), run_date),
                    persisted: false,
                })
            }
        }
    }

    /// Ignore any persisted record and start over. The persisted one is replaced by the first
    /// save.
    pub fn fresh(
        repo: Arc<dyn CheckpointRepository>,
        document: &DocumentId,
        run_date: NaiveDate,
    ) -> Self {
        tracing::info!(document_id = %document, run_date = %run_date, "Resume disabled, starting fresh");
        Self {
            repo,
            record: CheckpointRecord::fresh(document.clone(), run_date),
            persisted: false,
        }
    }

    /// Bind the store to `plan`: a fresh record takes the plan's totals and is persisted, an
    /// existing one must agree with the plan. A record without completed batches that no longer
    /// matches is rebound to it.
    pub async fn initialize(&mut self, plan: &BatchPlan) -> Result<(), CheckpointError> {
        if self.persisted {
            match self.validate(plan) {
                Ok(()) => return Ok(()),
                Err(err) if self.record.completed_batches.is_empty() && err.is_inconsistency() => {
                    tracing::warn!(
                        document_id = %self.record.document_id,
                        error = %err,
                        "Checkpoint has no completed batches, rebinding it to the current plan"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        let mut next = self.record.clone();
        next.processed_chunks = 0;
        next.total_chunks = plan.total_chunks;
        next.total_batches = plan.total_batches();
        next.updated_at = Utc::now();

        self.repo.save(&next).await?;
        self.record = next;
        self.persisted = true;
        Ok(())
    }

    pub fn validate(&self, plan: &BatchPlan) -> Result<(), CheckpointError> {
        let record = &self.record;
        self.check_known_batches(plan)?;

        if record.total_chunks != plan.total_chunks {
            return Err(CheckpointError::ChunkCountMismatch {
                recorded: record.total_chunks,
                planned: plan.total_chunks,
            });
        }
        if record.total_batches != plan.total_batches() {
            return Err(CheckpointError::BatchCountMismatch {
                recorded: record.total_batches,
                planned: plan.total_batches(),
            });
        }

        let expected: usize = record
            .completed_batches
            .iter()
            .filter_map(|index| plan.get(*index))
            .map(|batch| batch.chunk_count())
            .sum();
        if record.processed_chunks != expected {
            return Err(CheckpointError::ProcessedMismatch {
                recorded: record.processed_chunks,
                expected,
            });
        }

        Ok(())
    }

    fn check_known_batches(&self, plan: &BatchPlan) -> Result<(), CheckpointError> {
        match self
            .record
            .completed_batches
            .iter()
            .find(|index| !plan.contains(**index))
        {
            Some(index) => Err(CheckpointError::UnknownBatch {
                index: *index,
                total_batches: plan.total_batches(),
            }),
            None => Ok(()),
        }
    }

    /// Lowest batch of `plan` not yet completed; the resume entry point.
    pub fn next_pending_batch(&self, plan: &BatchPlan) -> Result<Option<u32>, CheckpointError> {
        self.check_known_batches(plan)?;
        Ok(plan
            .iter()
            .map(|batch| batch.index)
            .find(|index| !self.record.is_completed(*index)))
    }

    /// Mark `index` complete and persist before returning. Recording an already completed
    /// batch is a no-op.
    pub async fn record_batch_complete(
        &mut self,
        index: u32,
        chunk_count: usize,
    ) -> Result<(), CheckpointError> {
        if self.record.is_completed(index) {
            tracing::warn!(
                document_id = %self.record.document_id,
                batch_index = index,
                "Batch already recorded as complete, ignoring"
            );
            return Ok(());
        }
        if index == 0 || index > self.record.total_batches {
            return Err(CheckpointError::UnknownBatch {
                index,
                total_batches: self.record.total_batches,
            });
        }

        let mut next = self.record.clone();
        next.completed_batches.insert(index);
        next.processed_chunks += chunk_count;
        next.updated_at = Utc::now();

        self.repo.save(&next).await?;
        self.record = next;
        self.persisted = true;

        tracing::info!(
            document_id = %self.record.document_id,
            batch_index = index,
            processed_chunks = self.record.processed_chunks,
            total_chunks = self.record.total_chunks,
            completed_batches = self.record.completed_batches.len(),
            total_batches = self.record.total_batches,
            "Checkpoint updated"
        );
        Ok(())
    }

    pub fn record(&self) -> &CheckpointRecord {
        &self.record
    }

    pub fn run_date(&self) -> NaiveDate {
        self.record.run_date
    }

    pub fn last_completed_batch(&self) -> Option<u32> {
        self.record.last_completed_batch()
    }
}
