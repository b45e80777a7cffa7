use crate::domain::batch::BatchStatus;
use crate::domain::shared::DocumentId;
use crate::domain::text::SourcePosition;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchProgress {
    pub index: u32,
    pub chunk_count: usize,
    pub size: usize,
    pub status: BatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_position: Option<SourcePosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_position: Option<SourcePosition>,
}

/// Read-only progress view of one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub document_id: DocumentId,
    pub run_date: NaiveDate,
    pub processed_chunks: usize,
    pub total_chunks: usize,
    pub completed_batches: usize,
    pub total_batches: u32,
    pub last_completed_batch: Option<u32>,
    pub next_batch: Option<u32>,
    pub percent_complete: f64,
    pub is_complete: bool,
    pub updated_at: DateTime<Utc>,
    /// Empty when no plan has been written yet.
    pub batches: Vec<BatchProgress>,
}

/// Batch currently being worked on, per document, as published by an engine running in the
/// same process.
#[derive(Debug, Clone, Default)]
pub struct ActivityBoard {
    inner: Arc<RwLock<HashMap<DocumentId, (u32, BatchStatus)>>>,
}

impl ActivityBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, document: &DocumentId, batch_index: u32, status: BatchStatus) {
        self.inner
            .write()
            .await
            .insert(document.clone(), (batch_index, status));
    }

    pub async fn clear(&self, document: &DocumentId) {
        self.inner.write().await.remove(document);
    }

    pub async fn get(&self, document: &DocumentId) -> Option<(u32, BatchStatus)> {
        self.inner.read().await.get(document).copied()
    }
}
