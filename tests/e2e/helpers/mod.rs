use audiobook_batcher::controllers::progress::ProgressController;
use audiobook_batcher::domain::assembly::BatchAssembler;
use audiobook_batcher::domain::engine::{AudiobookEngine, EngineSettings};
use audiobook_batcher::domain::progress::{ActivityBoard, ProgressService};
use audiobook_batcher::domain::synthesis::{DispatcherConfig, SynthesisDispatcher};
use audiobook_batcher::domain::text::SizeMetric;
use audiobook_batcher::infrastructure::http::build_router;
use audiobook_batcher::infrastructure::repositories::{
    FileArtifactRepository, FileCheckpointRepository,
};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_context::AsyncTestContext;
use tokio::net::TcpListener;

pub mod api_client;
pub mod fixtures;
pub mod mock_tts;

use api_client::TestClient;
use mock_tts::MockTts;

pub const CHUNK_MAX_CHARS: usize = 200;
pub const BATCH_MAX_SIZE: usize = 1_000;

pub struct TestContext {
    pub client: TestClient,
    pub activity: ActivityBoard,
    output: TempDir,
}

impl AsyncTestContext for TestContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async {
            let output = tempfile::tempdir().expect("Failed to create output dir");
            let activity = ActivityBoard::new();

            let progress_service = Arc::new(ProgressService::new(
                Arc::new(FileCheckpointRepository::new(output.path())),
                Arc::new(FileArtifactRepository::new(output.path())),
                activity.clone(),
            ));
            let app = build_router(
                Arc::new(output.path().to_path_buf()),
                Arc::new(ProgressController::new(progress_service)),
            );

            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .expect("Failed to bind listener");
            let addr = listener.local_addr().expect("Failed to get local addr");
            let base_url = format!("http://{}", addr);

            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            // Wait for server to be ready
            tokio::time::sleep(Duration::from_millis(50)).await;

            Self {
                client: TestClient::new(&base_url),
                activity,
                output,
            }
        }
    }

    fn teardown(self) -> impl std::future::Future<Output = ()> + Send {
        async {
            // The output directory is removed when the TempDir drops
        }
    }
}

impl TestContext {
    pub fn output_dir(&self) -> &Path {
        self.output.path()
    }

    pub fn document_dir(&self) -> PathBuf {
        self.output_dir().join(fixtures::document().as_str())
    }

    pub fn engine(&self, tts: Arc<MockTts>) -> AudiobookEngine {
        self.engine_with(tts, false, 2)
    }

    pub fn engine_with(
        &self,
        tts: Arc<MockTts>,
        keep_chunks: bool,
        concurrency: usize,
    ) -> AudiobookEngine {
        let artifacts = Arc::new(FileArtifactRepository::new(self.output_dir()));
        let dispatcher = SynthesisDispatcher::new(
            tts,
            DispatcherConfig {
                concurrency,
                retry_limit: 2,
                timeout: Duration::from_secs(5),
                retry_backoff: Duration::from_millis(1),
            },
        );

        AudiobookEngine::new(
            dispatcher,
            BatchAssembler::new(artifacts.clone(), keep_chunks),
            Arc::new(FileCheckpointRepository::new(self.output_dir())),
            artifacts,
            EngineSettings {
                chunk_max_chars: NonZeroUsize::new(CHUNK_MAX_CHARS).unwrap(),
                batch_max_size: NonZeroUsize::new(BATCH_MAX_SIZE).unwrap(),
                metric: SizeMetric::Characters,
                run_date: Some(fixtures::run_date()),
                cooldown: Duration::ZERO,
                resume: true,
            },
        )
        .with_activity(self.activity.clone())
    }
}
