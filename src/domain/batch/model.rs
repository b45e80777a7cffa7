use crate::domain::text::{SizeMetric, SourcePosition};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Contiguous group of chunks; the unit of checkpointing and of output files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Dense, starting at 1.
    pub index: u32,
    /// Member chunk indices, half-open.
    pub chunks: Range<usize>,
    /// Cumulative size in the plan's metric.
    pub size: usize,
    pub char_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_position: Option<SourcePosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_position: Option<SourcePosition>,
}

impl Batch {
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn first_chunk(&self) -> usize {
        self.chunks.start
    }

    /// Inclusive.
    pub fn last_chunk(&self) -> usize {
        self.chunks.end.saturating_sub(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// The full partition of one document into batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPlan {
    pub metric: SizeMetric,
    pub max_size: usize,
    pub total_chunks: usize,
    pub batches: Vec<Batch>,
}

impl BatchPlan {
    pub fn get(&self, index: u32) -> Option<&Batch> {
        let position = index.checked_sub(1)? as usize;
        self.batches.get(position)
    }

    pub fn contains(&self, index: u32) -> bool {
        self.get(index).is_some()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn total_batches(&self) -> u32 {
        self.batches.len() as u32
    }

    pub fn iter(&self) -> impl Iterator<Item = &Batch> {
        self.batches.iter()
    }
}
