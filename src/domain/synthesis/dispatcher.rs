use super::error::{DispatchError, SynthesisError};
use super::model::{AudioClip, PartialResults};
use crate::domain::text::Chunk;
use crate::infrastructure::repositories::TtsRepository;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Tuning of the synthesis dispatcher, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Maximum in-flight synthesis calls (W). 1 serializes all calls.
    pub concurrency: usize,
    /// Retries after the first attempt for transient failures.
    pub retry_limit: u32,
    /// Per-call timeout; expiry counts as a transient failure.
    pub timeout: Duration,
    /// Linear backoff step: attempt `n` waits `n * retry_backoff` before retrying.
    pub retry_backoff: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            retry_limit: 2,
            timeout: Duration::from_secs(120),
            retry_backoff: Duration::from_millis(500),
        }
    }
}

enum ChunkOutcome {
    Done(AudioClip),
    Failed {
        attempts: u32,
        error: SynthesisError,
    },
    /// Never started, or interrupted by the abort token.
    Skipped,
}

/// Synthesizes the chunks of one batch with bounded concurrency.
pub struct SynthesisDispatcher {
    tts: Arc<dyn TtsRepository>,
    config: DispatcherConfig,
}

impl SynthesisDispatcher {
    pub fn new(tts: Arc<dyn TtsRepository>, mut config: DispatcherConfig) -> Self {
        config.concurrency = config.concurrency.max(1);
        Self { tts, config }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Synthesize `chunks` (the members of batch `batch_index`, in order) and return their
    /// clips in the same order, whatever order the calls finish in.
    ///
    /// The first chunk to exhaust its retries stops new calls from starting; calls already in
    /// flight are allowed to finish so their audio is reported in the error. Cancelling
    /// `abort` interrupts in-flight calls as well.
    pub async fn dispatch(
        &self,
        batch_index: u32,
        chunks: &[Chunk],
        abort: &CancellationToken,
    ) -> Result<Vec<AudioClip>, DispatchError> {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let halt = abort.child_token();
        let mut tasks = JoinSet::new();

        tracing::info!(
            batch_index,
            chunk_count = chunks.len(),
            concurrency = self.config.concurrency,
            provider = self.tts.provider(),
            "Dispatching batch"
        );

        for (position, chunk) in chunks.iter().enumerate() {
            let job = ChunkJob {
                batch_index,
                chunk_index: chunk.index,
                text: chunk.spoken().to_string(),
                tts: Arc::clone(&self.tts),
                config: self.config.clone(),
                semaphore: Arc::clone(&semaphore),
                halt: halt.clone(),
                abort: abort.clone(),
            };
            tasks.spawn(async move {
                let chunk_index = job.chunk_index;
                (position, chunk_index, job.run().await)
            });
        }

        let mut results: Vec<Option<AudioClip>> = (0..chunks.len()).map(|_| None).collect();
        let mut failure: Option<(usize, u32, SynthesisError)> = None;
        let mut task_error: Option<String> = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, _, ChunkOutcome::Done(clip))) => results[position] = Some(clip),
                Ok((_, chunk_index, ChunkOutcome::Failed { attempts, error })) => {
                    halt.cancel();
                    let lowest = failure
                        .as_ref()
                        .map_or(true, |(failed, _, _)| chunk_index < *failed);
                    if lowest {
                        failure = Some((chunk_index, attempts, error));
                    }
                }
                Ok((_, _, ChunkOutcome::Skipped)) => {}
                Err(e) => {
                    halt.cancel();
                    tracing::error!(batch_index, error = %e, "Synthesis task failed");
                    task_error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        let partial = || {
            PartialResults(
                results
                    .iter()
                    .zip(chunks)
                    .filter_map(|(clip, chunk)| clip.clone().map(|clip| (chunk.index, clip)))
                    .collect(),
            )
        };

        if let Some((chunk_index, attempts, source)) = failure {
            let partial = partial();
            tracing::error!(
                batch_index,
                chunk_index,
                attempts,
                error = %source,
                completed_chunks = partial.len(),
                "Batch synthesis failed"
            );
            return Err(DispatchError::ChunkFailed {
                batch_index,
                chunk_index,
                attempts,
                source,
                partial,
            });
        }

        if let Some(missing) = results.iter().position(Option::is_none) {
            let partial = partial();
            if let Some(message) = task_error {
                return Err(DispatchError::ChunkFailed {
                    batch_index,
                    chunk_index: chunks[missing].index,
                    attempts: 0,
                    source: SynthesisError::Permanent(message),
                    partial,
                });
            }
            tracing::warn!(
                batch_index,
                completed_chunks = partial.len(),
                chunk_count = chunks.len(),
                "Batch synthesis abandoned"
            );
            return Err(DispatchError::Abandoned {
                batch_index,
                partial,
            });
        }

        tracing::info!(
            batch_index,
            chunk_count = chunks.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Batch synthesized"
        );

        Ok(results.into_iter().flatten().collect())
    }
}

struct ChunkJob {
    batch_index: u32,
    chunk_index: usize,
    text: String,
    tts: Arc<dyn TtsRepository>,
    config: DispatcherConfig,
    semaphore: Arc<Semaphore>,
    /// Stops chunks that have not started yet.
    halt: CancellationToken,
    /// Stops everything, including calls in flight.
    abort: CancellationToken,
}

impl ChunkJob {
    async fn run(self) -> ChunkOutcome {
        // Nothing to say: whitespace-only chunks carry no audio.
        if self.text.is_empty() {
            return ChunkOutcome::Done(AudioClip::empty());
        }

        let _permit = tokio::select! {
            biased;
            _ = self.halt.cancelled() => return ChunkOutcome::Skipped,
            permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return ChunkOutcome::Skipped,
            },
        };
        if self.halt.is_cancelled() {
            return ChunkOutcome::Skipped;
        }

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let started = Instant::now();

            let result = tokio::select! {
                _ = self.abort.cancelled() => return ChunkOutcome::Skipped,
                result = tokio::time::timeout(self.config.timeout, self.tts.synthesize(&self.text)) => {
                    result.unwrap_or(Err(SynthesisError::Timeout(self.config.timeout)))
                }
            };

            match result {
                Ok(clip) => {
                    tracing::debug!(
                        batch_index = self.batch_index,
                        chunk_index = self.chunk_index,
                        attempt = attempts,
                        latency_ms = started.elapsed().as_millis() as u64,
                        samples = clip.samples.len(),
                        "Chunk synthesized"
                    );
                    return ChunkOutcome::Done(clip);
                }
                Err(error) if error.is_transient() && attempts <= self.config.retry_limit => {
                    let backoff = self.config.retry_backoff * attempts;
                    tracing::warn!(
                        batch_index = self.batch_index,
                        chunk_index = self.chunk_index,
                        attempt = attempts,
                        retry_limit = self.config.retry_limit,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %error,
                        "Transient synthesis failure, retrying"
                    );
                    tokio::select! {
                        _ = self.abort.cancelled() => return ChunkOutcome::Skipped,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
                Err(error) => {
                    tracing::warn!(
                        batch_index = self.batch_index,
                        chunk_index = self.chunk_index,
                        attempt = attempts,
                        error = %error,
                        "Chunk synthesis failed"
                    );
                    // Before the permit is released, so no waiting chunk starts.
                    self.halt.cancel();
                    return ChunkOutcome::Failed { attempts, error };
                }
            }
        }
    }
}
