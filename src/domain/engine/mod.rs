pub mod error;
pub mod model;
pub mod service;

pub use error::EngineError;
pub use model::{EngineSettings, RunControl, RunOutcome, RunReport};
pub use service::AudiobookEngine;
