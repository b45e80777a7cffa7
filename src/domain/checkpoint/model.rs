use crate::domain::shared::DocumentId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Persisted progress of one document.
///
/// `processed_chunks` always equals the summed chunk counts of `completed_batches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub document_id: DocumentId,
    /// Fixed when the first run starts; every artifact name of the document uses it.
    pub run_date: NaiveDate,
    pub total_chunks: usize,
    pub total_batches: u32,
    pub processed_chunks: usize,
    pub completed_batches: BTreeSet<u32>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CheckpointRecord {
    pub fn fresh(document_id: DocumentId, run_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            document_id,
            run_date,
            total_chunks: 0,
            total_batches: 0,
            processed_chunks: 0,
            completed_batches: BTreeSet::new(),
            started_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed(&self, index: u32) -> bool {
        self.completed_batches.contains(&index)
    }

    pub fn last_completed_batch(&self) -> Option<u32> {
        self.completed_batches.iter().next_back().copied()
    }

    pub fn is_complete(&self) -> bool {
        self.completed_batches.len() as u32 == self.total_batches
            && self.processed_chunks == self.total_chunks
    }
}
