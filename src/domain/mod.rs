pub mod assembly;
pub mod batch;
pub mod checkpoint;
pub mod engine;
pub mod progress;
pub mod shared;
pub mod synthesis;
pub mod text;
