use serde::{Deserialize, Serialize};

/// Where a chunk sits in the source layout. Both counters start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub page: u32,
    pub paragraph: u32,
}

/// Smallest unit of text submitted to synthesis.
///
/// `text` keeps the surrounding whitespace of the source so that concatenating all chunks in
/// index order reproduces the input byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub byte_offset: usize,
    pub char_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<SourcePosition>,
}

impl Chunk {
    /// The text that is actually spoken: surrounding whitespace carries no audio.
    pub fn spoken(&self) -> &str {
        self.text.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.spoken().is_empty()
    }

    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.byte_offset..self.byte_offset + self.text.len()
    }
}
