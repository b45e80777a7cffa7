use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Ready once the output directory exists, since every progress read comes from it.
pub async fn health_ready(State(output_dir): State<Arc<PathBuf>>) -> impl IntoResponse {
    match tokio::fs::metadata(output_dir.as_path()).await {
        Ok(metadata) if metadata.is_dir() => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "storage": "available"
            })),
        ),
        _ => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "storage": "unavailable"
            })),
        ),
    }
}
