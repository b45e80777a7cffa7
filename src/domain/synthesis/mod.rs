pub mod dispatcher;
pub mod error;
pub mod model;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::{DispatcherConfig, SynthesisDispatcher};
pub use error::{DispatchError, SynthesisError};
pub use model::{AudioClip, PartialResults};
