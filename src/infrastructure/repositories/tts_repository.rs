use crate::domain::synthesis::{AudioClip, SynthesisError};
use async_trait::async_trait;

/// Repository for TTS synthesis operations.
/// Abstracts the underlying TTS provider (AWS Polly, OpenAI, ...).
///
/// Implementations synthesize exactly the text they are given (chunking is done upstream) and
/// classify provider failures:
/// - `Transient` for throttling, timeouts, connection and 5xx errors (worth retrying)
/// - `Permanent` for everything retrying cannot fix (bad input, auth, unknown voice)
///
/// Calls must be idempotent: retrying the same text yields equivalent audio.
#[async_trait]
pub trait TtsRepository: Send + Sync {
    /// Synthesize `text` into mono 16-bit PCM.
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SynthesisError>;

    /// Short provider name for logs.
    fn provider(&self) -> &'static str;
}
