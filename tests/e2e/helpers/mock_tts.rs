use async_trait::async_trait;
use audiobook_batcher::domain::synthesis::{AudioClip, SynthesisError};
use audiobook_batcher::infrastructure::repositories::TtsRepository;
use parking_lot::Mutex;
use std::collections::HashMap;

pub const MOCK_SAMPLE_RATE: u32 = 16_000;

/// Deterministic provider: every byte of the text becomes one sample.
#[derive(Default)]
pub struct MockTts {
    failures: Mutex<HashMap<String, (u32, SynthesisError)>>,
    calls: Mutex<Vec<String>>,
}

impl MockTts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` calls for `text` with `error`.
    pub fn failing(self, text: &str, times: u32, error: SynthesisError) -> Self {
        self.failures
            .lock()
            .insert(text.to_string(), (times, error));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_for(&self, text: &str) -> usize {
        self.calls.lock().iter().filter(|t| *t == text).count()
    }

    pub fn expected_samples(text: &str) -> usize {
        text.len()
    }
}

#[async_trait]
impl TtsRepository for MockTts {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SynthesisError> {
        self.calls.lock().push(text.to_string());

        if let Some((remaining, error)) = self.failures.lock().get_mut(text) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(error.clone());
            }
        }

        let samples = text.bytes().map(|b| b as i16).collect();
        Ok(AudioClip::new(MOCK_SAMPLE_RATE, samples))
    }

    fn provider(&self) -> &'static str {
        "mock"
    }
}
