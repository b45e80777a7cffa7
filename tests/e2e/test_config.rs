use audiobook_batcher::infrastructure::config::{Config, Preset, RunMode, TtsProvider};
use serial_test::serial;
use std::time::Duration;

const KEYS: &[&str] = &[
    "RUN_MODE",
    "SOURCE_PATH",
    "DOCUMENT_ID",
    "PRESET",
    "SYNTH_TIMEOUT_MS",
    "TTS_PROVIDER",
    "BATCH_MAX_SIZE",
    "RESUME",
];

/// Runs `f` with the given variables set, restoring a clean slate afterwards.
fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
    for key in KEYS {
        std::env::remove_var(key);
    }
    for (key, value) in vars {
        std::env::set_var(key, value);
    }
    let result = f();
    for key in KEYS {
        std::env::remove_var(key);
    }
    result
}

#[test]
#[serial]
fn it_should_read_process_settings_from_the_environment() {
    let config = with_env(
        &[
            ("SOURCE_PATH", "/books/Moby Dick.txt"),
            ("PRESET", "quality"),
            ("SYNTH_TIMEOUT_MS", "45000"),
            ("TTS_PROVIDER", "openai"),
        ],
        Config::from_env,
    )
    .unwrap();

    assert_eq!(config.run_mode, RunMode::Process);
    assert_eq!(config.document_id.as_ref().unwrap().as_str(), "moby_dick");
    assert_eq!(config.preset, Preset::Quality);
    assert_eq!(config.synth_concurrency, 1);
    assert_eq!(config.synth_timeout, Duration::from_millis(45_000));
    assert_eq!(config.tts_provider, TtsProvider::OpenAi);
}

#[test]
#[serial]
fn it_should_reject_a_zero_batch_budget() {
    let err = with_env(
        &[("SOURCE_PATH", "book.txt"), ("BATCH_MAX_SIZE", "0")],
        Config::from_env,
    )
    .unwrap_err();

    assert!(err.to_string().contains("BATCH_MAX_SIZE must be positive"), "{err}");
}

#[test]
#[serial]
fn it_should_start_a_monitor_without_a_source() {
    let config = with_env(&[("RUN_MODE", "monitor")], Config::from_env).unwrap();

    assert_eq!(config.run_mode, RunMode::Monitor);
    assert!(config.serves_monitor());
    assert!(config.source_path.is_none());
}

#[test]
#[serial]
fn it_should_start_fresh_when_resume_is_disabled() {
    let config = with_env(
        &[("SOURCE_PATH", "book.txt"), ("RESUME", "false")],
        Config::from_env,
    )
    .unwrap();

    assert!(!config.resume);
    assert!(!config.engine_settings().resume);
}
