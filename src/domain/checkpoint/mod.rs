pub mod error;
pub mod model;
pub mod store;

pub use error::CheckpointError;
pub use model::CheckpointRecord;
pub use store::CheckpointStore;
