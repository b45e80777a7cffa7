pub mod measure;
pub mod model;
pub mod splitter;

pub use measure::{estimate_tokens, SizeMetric};
pub use model::{Chunk, SourcePosition};
pub use splitter::{split_within, UnitSplitter};
