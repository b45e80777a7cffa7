pub mod error;
pub mod model;
pub mod service;

pub use error::AssemblyError;
pub use model::{ArtifactName, BatchMetadata, Manifest, ManifestEntry};
pub use service::{encode_wav, BatchAssembler, DEFAULT_SAMPLE_RATE};
