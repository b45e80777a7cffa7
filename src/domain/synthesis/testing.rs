use super::error::SynthesisError;
use super::model::AudioClip;
use crate::infrastructure::repositories::TtsRepository;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const SAMPLE_RATE: u32 = 16_000;

/// Deterministic stand-in audio: one sample per byte of text.
pub fn encode(text: &str) -> Vec<i16> {
    text.bytes().map(i16::from).collect()
}

type DelayFn = Box<dyn Fn(&str) -> Duration + Send + Sync>;
type CallHook = Box<dyn Fn(&str) + Send + Sync>;

/// In-process TTS provider with scripted latency and failures.
#[derive(Default)]
pub struct ScriptedTts {
    delay: Option<DelayFn>,
    on_call: Option<CallHook>,
    failures: Mutex<HashMap<String, (u32, SynthesisError)>>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: impl Fn(&str) -> Duration + Send + Sync + 'static) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    pub fn on_call(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_call = Some(Box::new(hook));
        self
    }

    /// Fail the next `times` calls whose text equals `text`.
    pub fn fail_times(self, text: &str, times: u32, error: SynthesisError) -> Self {
        self.failures.lock().insert(text.to_string(), (times, error));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_for(&self, text: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == text).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TtsRepository for ScriptedTts {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, SynthesisError> {
        self.calls.lock().push(text.to_string());
        if let Some(hook) = &self.on_call {
            hook(text);
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self.delay.as_ref().map(|f| f(text));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = {
            let mut failures = self.failures.lock();
            match failures.get_mut(text) {
                Some((remaining, error)) if *remaining > 0 => {
                    *remaining -= 1;
                    Some(error.clone())
                }
                _ => None,
            }
        };
        if let Some(error) = scripted {
            return Err(error);
        }

        Ok(AudioClip::new(SAMPLE_RATE, encode(text)))
    }

    fn provider(&self) -> &'static str {
        "scripted"
    }
}
