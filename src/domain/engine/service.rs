use super::error::EngineError;
use super::model::{EngineSettings, RunControl, RunOutcome, RunReport};
use crate::domain::assembly::{ArtifactName, BatchAssembler, Manifest};
use crate::domain::batch::{Batch, BatchPlan, BatchPlanner, BatchStatus};
use crate::domain::checkpoint::CheckpointStore;
use crate::domain::progress::ActivityBoard;
use crate::domain::shared::DocumentId;
use crate::domain::synthesis::{AudioClip, DispatchError, SynthesisDispatcher};
use crate::domain::text::{Chunk, SizeMetric, UnitSplitter};
use crate::infrastructure::repositories::{ArtifactRepository, CheckpointRepository};
use chrono::Utc;
use std::sync::Arc;

/// Drives a document through split, plan, synthesis and assembly, one batch at a time,
/// checkpointing after every batch.
pub struct AudiobookEngine {
    dispatcher: SynthesisDispatcher,
    assembler: BatchAssembler,
    checkpoints: Arc<dyn CheckpointRepository>,
    artifacts: Arc<dyn ArtifactRepository>,
    settings: EngineSettings,
    activity: Option<ActivityBoard>,
}

impl AudiobookEngine {
    pub fn new(
        dispatcher: SynthesisDispatcher,
        assembler: BatchAssembler,
        checkpoints: Arc<dyn CheckpointRepository>,
        artifacts: Arc<dyn ArtifactRepository>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            dispatcher,
            assembler,
            checkpoints,
            artifacts,
            settings,
            activity: None,
        }
    }

    /// Publish the batch in progress to an in-process monitor.
    pub fn with_activity(mut self, activity: ActivityBoard) -> Self {
        self.activity = Some(activity);
        self
    }

    /// Split and plan `text` with the engine's budgets. Pure; nothing is persisted.
    pub fn plan(&self, text: &str) -> Result<(Vec<Chunk>, BatchPlan), EngineError> {
        let chunks = UnitSplitter::new(self.settings.chunk_max_chars).split(text);
        let plan = BatchPlanner::new(self.settings.batch_max_size, self.settings.metric)
            .plan(&chunks)?;
        Ok((chunks, plan))
    }

    /// Process every batch of `document` not yet recorded in its checkpoint.
    ///
    /// Batches already completed by an earlier run are neither synthesized nor rewritten.
    pub async fn run(
        &self,
        document: &DocumentId,
        text: &str,
        control: &RunControl,
    ) -> Result<RunReport, EngineError> {
        let (chunks, plan) = self.plan(text)?;
        let total_batches = plan.total_batches();

        let run_date = self
            .settings
            .run_date
            .unwrap_or_else(|| Utc::now().date_naive());
        let mut store = if self.settings.resume {
            CheckpointStore::load(Arc::clone(&self.checkpoints), document, run_date)
                .await
                .map_err(EngineError::from_checkpoint)?
        } else {
            CheckpointStore::fresh(Arc::clone(&self.checkpoints), document, run_date)
        };
        store
            .initialize(&plan)
            .await
            .map_err(EngineError::from_checkpoint)?;
        let run_date = store.run_date();
        let last_completed_batch = store.last_completed_batch();

        self.check_stored_plan(document, &plan, &store).await?;
        self.artifacts
            .save_plan(document, &plan)
            .await
            .map_err(|source| EngineError::Storage {
                source,
                last_completed_batch,
                total_batches,
            })?;

        let mut manifest = self
            .assembler
            .reconcile_manifest(
                document,
                run_date,
                &plan,
                &store.record().completed_batches,
            )
            .await
            .map_err(|source| EngineError::Manifest {
                source,
                last_completed_batch,
                total_batches,
            })?;

        let first_pending = store
            .next_pending_batch(&plan)
            .map_err(EngineError::from_checkpoint)?;
        tracing::info!(
            document_id = %document,
            run_date = %run_date,
            total_chunks = plan.total_chunks,
            total_batches,
            completed_batches = store.record().completed_batches.len(),
            next_batch = ?first_pending,
            "Run started"
        );

        let mut newly_completed = Vec::new();
        let mut outcome = RunOutcome::Completed;

        for batch in plan.iter() {
            if store.record().is_completed(batch.index) {
                continue;
            }
            if control.should_stop() {
                tracing::info!(next_batch = batch.index, "Stop requested, not starting next batch");
                outcome = RunOutcome::Stopped {
                    next_batch: batch.index,
                };
                break;
            }

            tracing::info!(
                batch_index = batch.index,
                total_batches,
                chunk_count = batch.chunk_count(),
                size = batch.size,
                "Batch started"
            );

            self.publish(document, batch.index, BatchStatus::InProgress).await;
            let name = ArtifactName::new(document.clone(), run_date, batch.index);
            let members = &chunks[batch.chunks.clone()];

            let clips = match self
                .dispatcher
                .dispatch(batch.index, members, &control.abort)
                .await
            {
                Ok(clips) => clips,
                Err(err) => {
                    if let Err(e) = self.assembler.retain_partial(&name, err.partial()).await {
                        tracing::warn!(batch_index = batch.index, error = %e, "Could not keep partial chunk audio");
                    }
                    match err {
                        DispatchError::Abandoned { batch_index, .. } => {
                            self.retire(document).await;
                            outcome = RunOutcome::Abandoned { batch_index };
                            break;
                        }
                        DispatchError::ChunkFailed {
                            batch_index,
                            chunk_index,
                            attempts,
                            source,
                            ..
                        } => {
                            self.publish(document, batch_index, BatchStatus::Failed).await;
                            return Err(EngineError::BatchFailed {
                                batch_index,
                                chunk_index,
                                attempts,
                                source,
                                last_completed_batch: store.last_completed_batch(),
                                total_batches,
                            });
                        }
                    }
                }
            };

            if let Err(err) = self
                .commit_batch(&mut store, &mut manifest, &name, batch, plan.metric, &clips)
                .await
            {
                self.publish(document, batch.index, BatchStatus::Failed).await;
                return Err(err);
            }
            self.retire(document).await;
            newly_completed.push(batch.index);

            self.cool_down(control, batch.index < total_batches).await;
        }

        let record = store.record();
        let report = RunReport {
            document_id: document.clone(),
            run_date,
            total_chunks: record.total_chunks,
            total_batches: record.total_batches,
            processed_chunks: record.processed_chunks,
            completed_batches: record.completed_batches.iter().copied().collect(),
            newly_completed,
            outcome,
        };

        tracing::info!(
            document_id = %document,
            processed_chunks = report.processed_chunks,
            total_chunks = report.total_chunks,
            completed_batches = report.completed_batches.len(),
            total_batches = report.total_batches,
            newly_completed = report.newly_completed.len(),
            outcome = ?report.outcome,
            "Run finished"
        );

        Ok(report)
    }

    /// Assemble, list in the manifest, then checkpoint. The checkpoint write comes last so a
    /// batch is only ever recorded once its artifacts are durable.
    async fn commit_batch(
        &self,
        store: &mut CheckpointStore,
        manifest: &mut Manifest,
        name: &ArtifactName,
        batch: &Batch,
        metric: SizeMetric,
        clips: &[AudioClip],
    ) -> Result<(), EngineError> {
        let total_batches = store.record().total_batches;
        let last_completed_batch = store.last_completed_batch();
        let assembly_error = |source| EngineError::Assembly {
            batch_index: batch.index,
            source,
            last_completed_batch,
            total_batches,
        };

        let metadata = self
            .assembler
            .assemble(name, batch, metric, clips)
            .await
            .map_err(assembly_error)?;
        self.assembler
            .append_to_manifest(manifest, name, &metadata)
            .await
            .map_err(assembly_error)?;

        store
            .record_batch_complete(batch.index, batch.chunk_count())
            .await
            .map_err(|source| EngineError::Persistence {
                batch_index: batch.index,
                source,
                last_completed_batch,
                total_batches,
            })
    }

    async fn publish(&self, document: &DocumentId, batch_index: u32, status: BatchStatus) {
        if let Some(activity) = &self.activity {
            activity.set(document, batch_index, status).await;
        }
    }

    async fn retire(&self, document: &DocumentId) {
        if let Some(activity) = &self.activity {
            activity.clear(document).await;
        }
    }

    /// A plan differing from the one completed batches were produced under would misalign
    /// their audio with the text.
    async fn check_stored_plan(
        &self,
        document: &DocumentId,
        plan: &BatchPlan,
        store: &CheckpointStore,
    ) -> Result<(), EngineError> {
        let completed = store.record().completed_batches.len();
        if completed == 0 {
            return Ok(());
        }
        let last_completed_batch = store.last_completed_batch();
        let total_batches = plan.total_batches();
        let stored = self
            .artifacts
            .load_plan(document)
            .await
            .map_err(|source| EngineError::Storage {
                source,
                last_completed_batch,
                total_batches,
            })?;
        match stored {
            Some(stored) if &stored != plan => Err(EngineError::PlanChanged {
                stored_batches: stored.total_batches(),
                planned_batches: total_batches,
                completed,
                last_completed_batch,
                total_batches,
            }),
            _ => Ok(()),
        }
    }

    async fn cool_down(&self, control: &RunControl, more_batches: bool) {
        if self.settings.cooldown.is_zero() || !more_batches {
            return;
        }
        tracing::debug!(
            cooldown_ms = self.settings.cooldown.as_millis() as u64,
            "Cooling down before next batch"
        );
        tokio::select! {
            _ = tokio::time::sleep(self.settings.cooldown) => {}
            _ = control.stop.cancelled() => {}
            _ = control.abort.cancelled() => {}
        }
    }
}
