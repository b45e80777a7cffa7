use super::tts_repository::TtsRepository;
use crate::domain::synthesis::{AudioClip, SynthesisError};
use crate::domain::text::split_within;
use async_trait::async_trait;
use aws_sdk_polly::{
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::synthesize_speech::SynthesizeSpeechError,
    types::{Engine, OutputFormat, VoiceId},
    Client as PollyClient,
};
use std::sync::Arc;

/// Polly returns raw signed 16-bit little-endian mono PCM at the requested rate
pub const POLLY_SAMPLE_RATE: u32 = 16_000;

/// AWS Polly has a limit of 3000 characters per request
const MAX_REQUEST_CHARS: usize = 3000;

const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "Throttling",
    "TooManyRequestsException",
];

/// AWS Polly implementation of TTS repository
pub struct PollyTtsRepository {
    polly_client: Arc<PollyClient>,
    voice: String,
    engine: String,
}

impl PollyTtsRepository {
    pub fn new(polly_client: Arc<PollyClient>, voice: String, engine: String) -> Self {
        Self {
            polly_client,
            voice,
            engine,
        }
    }

    /// Call AWS Polly to synthesize one chunk
    async fn call_polly(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let voice_id = VoiceId::from(self.voice.as_str());
        let engine = Engine::from(self.engine.as_str());

        tracing::debug!(
            voice = %self.voice,
            engine = %self.engine,
            output_format = "Pcm",
            text_length = text.len(),
            "Calling AWS Polly synthesize_speech"
        );

        let result = self
            .polly_client
            .synthesize_speech()
            .text(text)
            .voice_id(voice_id)
            .output_format(OutputFormat::Pcm)
            .sample_rate(POLLY_SAMPLE_RATE.to_string())
            .engine(engine)
            .send()
            .await
            .map_err(|e| {
                let classified = classify_polly_error(&e);
                tracing::warn!(
                    error = %DisplayErrorContext(&e),
                    transient = classified.is_transient(),
                    voice = %self.voice,
                    text_length = text.len(),
                    "AWS Polly synthesize_speech failed"
                );
                classified
            })?;

        let audio_stream = result.audio_stream.collect().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to collect audio stream from Polly response");
            SynthesisError::Transient(format!("Failed to read audio stream: {}", e))
        })?;

        Ok(audio_stream.into_bytes().to_vec())
    }
}

/// Throttling, service failures and anything that never got a response are worth retrying.
fn classify_polly_error<R: std::fmt::Debug>(
    err: &SdkError<SynthesizeSpeechError, R>,
) -> SynthesisError {
    let message = DisplayErrorContext(err).to_string();
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            SynthesisError::Transient(message)
        }
        SdkError::ServiceError(context) => {
            let service_error = context.err();
            let throttled = service_error
                .code()
                .map(|code| THROTTLING_CODES.contains(&code))
                .unwrap_or(false);
            if service_error.is_service_failure_exception() || throttled {
                SynthesisError::Transient(message)
            } else {
                SynthesisError::Permanent(message)
            }
        }
        _ => SynthesisError::Permanent(message),
    }
}

#[async_trait]
impl TtsRepository for PollyTtsRepository {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SynthesisError> {
        let start_time = std::time::Instant::now();

        // A chunk over the request limit is sent in pieces and the audio joined back up
        let pieces = split_within(text, MAX_REQUEST_CHARS);
        let mut pcm = Vec::new();
        for piece in &pieces {
            pcm.extend(self.call_polly(piece.trim()).await?);
        }
        if pieces.len() > 1 {
            tracing::debug!(
                pieces = pieces.len(),
                characters_count = text.chars().count(),
                "Text over the Polly request limit was sent in pieces"
            );
        }
        let clip = AudioClip::from_pcm_le(&pcm, POLLY_SAMPLE_RATE);

        let duration = start_time.elapsed();
        tracing::debug!(
            provider = "polly",
            latency_ms = duration.as_millis() as u64,
            characters_count = text.chars().count(),
            audio_size_bytes = pcm.len(),
            audio_secs = format!("{:.2}", clip.duration_secs()),
            "TTS synthesis completed"
        );

        Ok(clip)
    }

    fn provider(&self) -> &'static str {
        "polly"
    }
}
