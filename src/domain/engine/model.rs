use crate::domain::shared::DocumentId;
use crate::domain::text::SizeMetric;
use chrono::NaiveDate;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Planning and pacing knobs of a run.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub chunk_max_chars: NonZeroUsize,
    pub batch_max_size: NonZeroUsize,
    pub metric: SizeMetric,
    /// Date stamped into a new checkpoint; `None` means today (UTC). Ignored when resuming.
    pub run_date: Option<NaiveDate>,
    /// Pause between two batches.
    pub cooldown: Duration,
    /// Continue from the persisted checkpoint. When false the run starts over from batch 1.
    pub resume: bool,
}

/// Interruption handles for a run.
///
/// `stop` lets the in-flight batch finish and prevents the next one from starting. `abort`
/// also interrupts the in-flight batch, which is then left unrecorded.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    pub stop: CancellationToken,
    pub abort: CancellationToken,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_stop(&self) -> bool {
        self.stop.is_cancelled() || self.abort.is_cancelled()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    Stopped { next_batch: u32 },
    Abandoned { batch_index: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub document_id: DocumentId,
    pub run_date: NaiveDate,
    pub total_chunks: usize,
    pub total_batches: u32,
    pub processed_chunks: usize,
    pub completed_batches: Vec<u32>,
    /// Batches completed by this run, in order.
    pub newly_completed: Vec<u32>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn last_completed_batch(&self) -> Option<u32> {
        self.completed_batches.last().copied()
    }
}
