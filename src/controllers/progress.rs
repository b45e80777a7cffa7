use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::domain::assembly::Manifest;
use crate::domain::progress::{ProgressServiceApi, ProgressSnapshot};
use crate::error::AppResult;

pub struct ProgressController {
    progress_service: Arc<dyn ProgressServiceApi>,
}

impl ProgressController {
    pub fn new(progress_service: Arc<dyn ProgressServiceApi>) -> Self {
        Self { progress_service }
    }

    /// GET /api/documents/:documentId/progress - Checkpoint counts and per-batch status
    pub async fn get_progress(
        State(controller): State<Arc<ProgressController>>,
        Path(document_id): Path<String>,
    ) -> AppResult<Json<ProgressSnapshot>> {
        let snapshot = controller.progress_service.progress(&document_id).await?;
        Ok(Json(snapshot))
    }

    /// GET /api/documents/:documentId/manifest - Completed batch artifacts in order
    pub async fn get_manifest(
        State(controller): State<Arc<ProgressController>>,
        Path(document_id): Path<String>,
    ) -> AppResult<Json<Manifest>> {
        let manifest = controller.progress_service.manifest(&document_id).await?;
        Ok(Json(manifest))
    }
}
