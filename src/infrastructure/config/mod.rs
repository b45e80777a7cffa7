use crate::domain::engine::EngineSettings;
use crate::domain::shared::DocumentId;
use crate::domain::synthesis::DispatcherConfig;
use crate::domain::text::SizeMetric;
use crate::infrastructure::repositories::openai_tts_repository::OPENAI_VOICES;
use chrono::NaiveDate;
use serde::Deserialize;
use std::env;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

type ConfigResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Clone)]
pub struct Config {
    pub run_mode: RunMode,
    pub source_path: Option<PathBuf>,
    pub document_id: Option<DocumentId>,
    pub output_dir: PathBuf,
    // Planning
    pub chunk_max_chars: NonZeroUsize,
    pub batch_max_size: NonZeroUsize,
    pub batch_size_metric: SizeMetric,
    // Synthesis
    pub preset: Preset,
    pub synth_concurrency: usize,
    pub synth_retry_limit: u32,
    pub synth_timeout: Duration,
    pub synth_retry_backoff: Duration,
    pub batch_cooldown: Duration,
    pub keep_chunks: bool,
    pub resume: bool,
    pub run_date: Option<NaiveDate>,
    // Providers
    pub tts_provider: TtsProvider,
    pub aws_region: String,
    pub polly_voice: String,
    pub polly_engine: String,
    pub openai_tts_model: String,
    pub openai_tts_voice: String,
    // Monitor
    pub monitor_enabled: bool,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Process,
    Monitor,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Fast,
    Balanced,
    Quality,
}

impl Preset {
    pub fn concurrency(&self) -> usize {
        match self {
            Preset::Fast => 4,
            Preset::Balanced => 2,
            Preset::Quality => 1,
        }
    }

    pub fn timeout(&self) -> Duration {
        match self {
            Preset::Fast => Duration::from_secs(60),
            Preset::Balanced => Duration::from_secs(120),
            Preset::Quality => Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    Polly,
    OpenAi,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> ConfigResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let run_mode = match var("RUN_MODE", "process").to_lowercase().as_str() {
            "process" => RunMode::Process,
            "monitor" => RunMode::Monitor,
            other => return Err(invalid("RUN_MODE", other, "'process' or 'monitor'")),
        };

        let source_path = lookup("SOURCE_PATH").map(PathBuf::from);
        if run_mode == RunMode::Process && source_path.is_none() {
            return Err("SOURCE_PATH is required when RUN_MODE=process".into());
        }

        let document_id = match lookup("DOCUMENT_ID") {
            Some(raw) => Some(
                DocumentId::parse(&raw).map_err(|e| format!("Invalid DOCUMENT_ID: {}", e))?,
            ),
            None => match &source_path {
                Some(path) => Some(DocumentId::from_path(path).map_err(|e| {
                    format!(
                        "Cannot derive a document id from {}: {}. Set DOCUMENT_ID",
                        path.display(),
                        e
                    )
                })?),
                None => None,
            },
        };

        let preset = match var("PRESET", "balanced").to_lowercase().as_str() {
            "fast" => Preset::Fast,
            "balanced" => Preset::Balanced,
            "quality" => Preset::Quality,
            other => return Err(invalid("PRESET", other, "'fast', 'balanced' or 'quality'")),
        };

        let synth_concurrency = match lookup("SYNTH_CONCURRENCY") {
            Some(raw) => positive("SYNTH_CONCURRENCY", &raw)?.get(),
            None => preset.concurrency(),
        };
        let synth_timeout = match lookup("SYNTH_TIMEOUT_MS") {
            Some(raw) => positive_millis("SYNTH_TIMEOUT_MS", &raw)?,
            None => preset.timeout(),
        };

        let tts_provider = match var("TTS_PROVIDER", "polly").to_lowercase().as_str() {
            "polly" => TtsProvider::Polly,
            "openai" => TtsProvider::OpenAi,
            other => return Err(invalid("TTS_PROVIDER", other, "'polly' or 'openai'")),
        };

        let polly_engine = var("POLLY_ENGINE", "neural").to_lowercase();
        if polly_engine != "neural" && polly_engine != "standard" {
            return Err(invalid("POLLY_ENGINE", &polly_engine, "'neural' or 'standard'"));
        }

        let openai_tts_voice = var("OPENAI_TTS_VOICE", "alloy").to_lowercase();
        if !OPENAI_VOICES.contains(&openai_tts_voice.as_str()) {
            return Err(invalid(
                "OPENAI_TTS_VOICE",
                &openai_tts_voice,
                &OPENAI_VOICES.join(", "),
            ));
        }

        let log_format = match var("LOG_FORMAT", "pretty").to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => return Err(invalid("LOG_FORMAT", other, "'pretty' or 'json'")),
        };

        let run_date = match lookup("RUN_DATE") {
            Some(raw) => Some(
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .map_err(|e| format!("Invalid RUN_DATE '{}' (expected YYYY-MM-DD): {}", raw, e))?,
            ),
            None => None,
        };

        let config = Config {
            run_mode,
            source_path,
            document_id,
            output_dir: PathBuf::from(var("OUTPUT_DIR", "audiobook_output")),
            chunk_max_chars: positive("CHUNK_MAX_CHARS", &var("CHUNK_MAX_CHARS", "200"))?,
            batch_max_size: positive("BATCH_MAX_SIZE", &var("BATCH_MAX_SIZE", "40000"))?,
            batch_size_metric: SizeMetric::from_str(&var("BATCH_SIZE_METRIC", "characters"))
                .map_err(|e| format!("Invalid BATCH_SIZE_METRIC: {}", e))?,
            preset,
            synth_concurrency,
            synth_retry_limit: parse("SYNTH_RETRY_LIMIT", &var("SYNTH_RETRY_LIMIT", "2"))?,
            synth_timeout,
            synth_retry_backoff: Duration::from_millis(parse(
                "SYNTH_RETRY_BACKOFF_MS",
                &var("SYNTH_RETRY_BACKOFF_MS", "500"),
            )?),
            batch_cooldown: Duration::from_millis(parse(
                "BATCH_COOLDOWN_MS",
                &var("BATCH_COOLDOWN_MS", "0"),
            )?),
            keep_chunks: flag(&var("KEEP_CHUNKS", "false")),
            resume: flag(&var("RESUME", "true")),
            run_date,
            tts_provider,
            aws_region: var("AWS_REGION", "eu-west-1"),
            polly_voice: var("POLLY_VOICE", "Joanna"),
            polly_engine,
            openai_tts_model: var("OPENAI_TTS_MODEL", "tts-1"),
            openai_tts_voice,
            monitor_enabled: flag(&var("MONITOR_ENABLED", "false")),
            host: var("HOST", "0.0.0.0"),
            port: parse("PORT", &var("PORT", "8080"))?,
            log_format,
        };

        Ok(config)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            chunk_max_chars: self.chunk_max_chars,
            batch_max_size: self.batch_max_size,
            metric: self.batch_size_metric,
            run_date: self.run_date,
            cooldown: self.batch_cooldown,
            resume: self.resume,
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            concurrency: self.synth_concurrency,
            retry_limit: self.synth_retry_limit,
            timeout: self.synth_timeout,
            retry_backoff: self.synth_retry_backoff,
        }
    }

    pub fn serves_monitor(&self) -> bool {
        self.run_mode == RunMode::Monitor || self.monitor_enabled
    }
}

fn invalid(key: &str, value: &str, expected: &str) -> Box<dyn std::error::Error> {
    format!("Invalid {} '{}', expected {}", key, value, expected).into()
}

fn parse<T>(key: &str, raw: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| format!("Invalid {} '{}': {}", key, raw, e).into())
}

fn positive(key: &str, raw: &str) -> ConfigResult<NonZeroUsize> {
    NonZeroUsize::new(parse(key, raw)?).ok_or_else(|| format!("{} must be positive", key).into())
}

fn positive_millis(key: &str, raw: &str) -> ConfigResult<Duration> {
    match parse::<u64>(key, raw)? {
        0 => Err(format!("{} must be positive", key).into()),
        millis => Ok(Duration::from_millis(millis)),
    }
}

fn flag(raw: &str) -> bool {
    matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes")
}
