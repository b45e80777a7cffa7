// End-to-end tests for the audiobook batcher
//
// Each test gets its own temporary output directory, a monitor server bound to an
// ephemeral port and an in-process mock TTS provider, so tests run in parallel without
// sharing state.

mod helpers;
mod test_config;
mod test_engine;
mod test_health;
mod test_progress;
