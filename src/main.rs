use audiobook_batcher::controllers::progress::ProgressController;
use audiobook_batcher::domain::assembly::BatchAssembler;
use audiobook_batcher::domain::engine::{AudiobookEngine, RunControl, RunOutcome, RunReport};
use audiobook_batcher::domain::progress::{ActivityBoard, ProgressService};
use audiobook_batcher::domain::synthesis::SynthesisDispatcher;
use audiobook_batcher::infrastructure::config::{Config, LogFormat, RunMode, TtsProvider};
use audiobook_batcher::infrastructure::http::{build_router, start_http_server};
use audiobook_batcher::infrastructure::repositories::{
    FileArtifactRepository, FileCheckpointRepository, OpenAiTtsRepository, PollyTtsRepository,
    TtsRepository,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    init_logging(&config);

    tracing::info!(
        run_mode = ?config.run_mode,
        output_dir = %config.output_dir.display(),
        "Starting audiobook batcher"
    );

    tokio::fs::create_dir_all(&config.output_dir).await?;
    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    let checkpoint_repo = Arc::new(FileCheckpointRepository::new(config.output_dir.clone()));
    let artifact_repo = Arc::new(FileArtifactRepository::new(config.output_dir.clone()));
    let activity = ActivityBoard::new();

    let monitor_shutdown = CancellationToken::new();
    let monitor = if config.serves_monitor() {
        let progress_service = Arc::new(ProgressService::new(
            checkpoint_repo.clone(),
            artifact_repo.clone(),
            activity.clone(),
        ));
        let progress_controller = Arc::new(ProgressController::new(progress_service));
        let app = build_router(Arc::new(config.output_dir.clone()), progress_controller);
        Some(spawn_monitor(config.clone(), app, monitor_shutdown.clone()))
    } else {
        None
    };

    let result = match config.run_mode {
        RunMode::Monitor => {
            tracing::info!("Monitor mode, press Ctrl-C to exit");
            tokio::signal::ctrl_c().await?;
            Ok(())
        }
        RunMode::Process => {
            process(
                &config,
                checkpoint_repo,
                artifact_repo,
                activity,
            )
            .await
        }
    };

    monitor_shutdown.cancel();
    if let Some(handle) = monitor {
        let _ = handle.await;
    }

    result
}

async fn process(
    config: &Config,
    checkpoint_repo: Arc<FileCheckpointRepository>,
    artifact_repo: Arc<FileArtifactRepository>,
    activity: ActivityBoard,
) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(source_path), Some(document_id)) = (&config.source_path, &config.document_id)
    else {
        return Err("SOURCE_PATH is required when RUN_MODE=process".into());
    };

    let bytes = tokio::fs::read(source_path).await.map_err(|e| {
        format!("Cannot read source {}: {}", source_path.display(), e)
    })?;
    let text = String::from_utf8(bytes)
        .map_err(|e| format!("Source {} is not valid UTF-8: {}", source_path.display(), e))?;

    let tts = create_tts_repository(config).await;
    tracing::info!(
        provider = tts.provider(),
        concurrency = config.synth_concurrency,
        retry_limit = config.synth_retry_limit,
        timeout_ms = config.synth_timeout.as_millis() as u64,
        preset = ?config.preset,
        resume = config.resume,
        "TTS provider initialized"
    );

    let dispatcher = SynthesisDispatcher::new(tts, config.dispatcher_config());
    let assembler = BatchAssembler::new(artifact_repo.clone(), config.keep_chunks);
    let engine = AudiobookEngine::new(
        dispatcher,
        assembler,
        checkpoint_repo,
        artifact_repo,
        config.engine_settings(),
    )
    .with_activity(activity);

    let control = RunControl::new();
    let signals = spawn_signal_handler(control.clone());

    let result = engine.run(document_id, &text, &control).await;
    signals.abort();

    match result {
        Ok(report) => {
            log_report(&report);
            Ok(())
        }
        Err(err) => {
            tracing::error!(
                document_id = %document_id,
                error = %err,
                last_completed_batch = ?err.last_completed_batch(),
                total_batches = ?err.total_batches(),
                "Run failed, completed batches are kept and the next run resumes after them"
            );
            Err(err.into())
        }
    }
}

async fn create_tts_repository(config: &Config) -> Arc<dyn TtsRepository> {
    match config.tts_provider {
        TtsProvider::Polly => {
            let has_access_key = std::env::var("AWS_ACCESS_KEY_ID").is_ok();
            let has_secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").is_ok();
            if !has_access_key || !has_secret_key {
                tracing::warn!("AWS credentials not found in environment variables. Will attempt to use other credential providers (instance metadata, etc.)");
            }

            let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(config.aws_region.clone()))
                .load()
                .await;
            tracing::info!(region = ?aws_config.region(), "AWS configuration loaded");

            let polly_client = Arc::new(aws_sdk_polly::Client::new(&aws_config));
            Arc::new(PollyTtsRepository::new(
                polly_client,
                config.polly_voice.clone(),
                config.polly_engine.clone(),
            ))
        }
        TtsProvider::OpenAi => {
            let client = Arc::new(async_openai::Client::new());
            Arc::new(OpenAiTtsRepository::new(
                client,
                config.openai_tts_model.clone(),
                config.openai_tts_voice.clone(),
            ))
        }
    }
}

/// First Ctrl-C finishes the in-flight batch, the second abandons it.
fn spawn_signal_handler(control: RunControl) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupt received, finishing the current batch. Press Ctrl-C again to abandon it");
        control.stop.cancel();

        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Second interrupt, abandoning the current batch");
        control.abort.cancel();
    })
}

fn spawn_monitor(
    config: Arc<Config>,
    app: axum::Router,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = start_http_server(config, app, shutdown).await {
            tracing::error!(error = %e, "Monitor server failed");
        }
    })
}

fn log_report(report: &RunReport) {
    tracing::info!(
        document_id = %report.document_id,
        processed_chunks = report.processed_chunks,
        total_chunks = report.total_chunks,
        completed_batches = report.completed_batches.len(),
        total_batches = report.total_batches,
        "Progress: {}/{} chunks, {}/{} batches",
        report.processed_chunks,
        report.total_chunks,
        report.completed_batches.len(),
        report.total_batches
    );

    match &report.outcome {
        RunOutcome::Completed => tracing::info!("All batches complete"),
        RunOutcome::Stopped { next_batch } => tracing::info!(
            next_batch,
            "Stopped between batches, rerun to resume at batch {}",
            next_batch
        ),
        RunOutcome::Abandoned { batch_index } => tracing::warn!(
            batch_index,
            last_completed_batch = ?report.last_completed_batch(),
            "Batch {} was abandoned and will be redone on the next run",
            batch_index
        ),
    }
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "audiobook_batcher=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "audiobook_batcher=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
