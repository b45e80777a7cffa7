pub mod error;
pub mod model;
pub mod service;

pub use error::ProgressServiceError;
pub use model::{ActivityBoard, BatchProgress, ProgressSnapshot};
pub use service::{ProgressService, ProgressServiceApi};
