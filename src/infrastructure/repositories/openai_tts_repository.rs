use super::tts_repository::TtsRepository;
use crate::domain::synthesis::{AudioClip, SynthesisError};
use crate::domain::text::split_within;
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{CreateSpeechRequest, SpeechModel, SpeechResponseFormat, Voice},
    Client,
};
use async_trait::async_trait;
use std::sync::Arc;

/// OpenAI `pcm` responses are 24kHz signed 16-bit little-endian mono
pub const OPENAI_SAMPLE_RATE: u32 = 24_000;

/// Voices accepted by the speech endpoint
pub const OPENAI_VOICES: &[&str] = &["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

/// OpenAI TTS has a limit of 4096 characters per request
const MAX_REQUEST_CHARS: usize = 4096;

/// OpenAI TTS implementation of TTS repository
pub struct OpenAiTtsRepository {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
    voice: String,
}

impl OpenAiTtsRepository {
    pub fn new(client: Arc<Client<OpenAIConfig>>, model: String, voice: String) -> Self {
        Self {
            client,
            model,
            voice,
        }
    }

    fn speech_model(&self) -> SpeechModel {
        match self.model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        }
    }

    fn speech_voice(&self) -> Voice {
        match self.voice.to_lowercase().as_str() {
            "echo" => Voice::Echo,
            "fable" => Voice::Fable,
            "onyx" => Voice::Onyx,
            "nova" => Voice::Nova,
            "shimmer" => Voice::Shimmer,
            _ => Voice::Alloy,
        }
    }

    /// Call OpenAI TTS API to synthesize one chunk
    async fn call_openai(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        tracing::debug!(
            model = %self.model,
            voice = %self.voice,
            text_length = text.len(),
            "Calling OpenAI TTS API"
        );

        let request = CreateSpeechRequest {
            model: self.speech_model(),
            input: text.to_string(),
            voice: self.speech_voice(),
            response_format: Some(SpeechResponseFormat::Pcm),
            speed: None,
        };

        let response = self.client.audio().speech(request).await.map_err(|e| {
            let classified = classify_openai_error(&e);
            tracing::warn!(
                error = %e,
                transient = classified.is_transient(),
                model = %self.model,
                text_length = text.len(),
                "OpenAI TTS API call failed"
            );
            classified
        })?;

        Ok(response.bytes.to_vec())
    }
}

/// Rate limits, server errors and transport failures are retried; rejected requests are not.
fn classify_openai_error(err: &OpenAIError) -> SynthesisError {
    let message = format!("OpenAI TTS error: {}", err);
    match err {
        OpenAIError::Reqwest(e) => {
            let rejected = e.status().map(|s| s.is_client_error()).unwrap_or(false);
            if rejected && e.status().map(|s| s.as_u16()) != Some(429) {
                SynthesisError::Permanent(message)
            } else {
                SynthesisError::Transient(message)
            }
        }
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.as_deref().unwrap_or_default();
            let code = api.code.as_deref().unwrap_or_default();
            let retryable = ["rate_limit_exceeded", "server_error", "insufficient_capacity"];
            if retryable.contains(&kind) || retryable.contains(&code) {
                SynthesisError::Transient(message)
            } else {
                SynthesisError::Permanent(message)
            }
        }
        OpenAIError::StreamError(_) => SynthesisError::Transient(message),
        _ => SynthesisError::Permanent(message),
    }
}

#[async_trait]
impl TtsRepository for OpenAiTtsRepository {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SynthesisError> {
        let start_time = std::time::Instant::now();

        // A chunk over the request limit is sent in pieces and the audio joined back up
        let pieces = split_within(text, MAX_REQUEST_CHARS);
        let mut pcm = Vec::new();
        for piece in &pieces {
            pcm.extend(self.call_openai(piece.trim()).await?);
        }
        if pieces.len() > 1 {
            tracing::debug!(
                pieces = pieces.len(),
                characters_count = text.chars().count(),
                "Text over the OpenAI request limit was sent in pieces"
            );
        }
        let clip = AudioClip::from_pcm_le(&pcm, OPENAI_SAMPLE_RATE);

        let duration = start_time.elapsed();
        tracing::debug!(
            provider = "openai",
            model = %self.model,
            voice = %self.voice,
            latency_ms = duration.as_millis() as u64,
            characters_count = text.chars().count(),
            audio_size_bytes = pcm.len(),
            "TTS synthesis completed"
        );

        Ok(clip)
    }

    fn provider(&self) -> &'static str {
        "openai"
    }
}
