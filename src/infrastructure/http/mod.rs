use axum::{middleware, routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::controllers::{health, progress::ProgressController};
use crate::infrastructure::config::Config;

pub mod request_id;

pub use request_id::{request_id_middleware, RequestId, X_REQUEST_ID};

/// Read-only monitor routes
pub fn build_router(
    output_dir: Arc<PathBuf>,
    progress_controller: Arc<ProgressController>,
) -> Router {
    let progress_routes = Router::new()
        .route(
            "/api/documents/:documentId/progress",
            get(ProgressController::get_progress),
        )
        .route(
            "/api/documents/:documentId/manifest",
            get(ProgressController::get_manifest),
        )
        .with_state(progress_controller);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(output_dir)
        .merge(progress_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_id_middleware)),
        )
}

/// Serve `app` until `shutdown` is cancelled
pub async fn start_http_server(
    config: Arc<Config>,
    app: Router,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Monitor listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
