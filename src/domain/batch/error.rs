#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("chunk sequence is not contiguous: expected index {expected}, found {found}")]
    NonContiguousChunks { expected: usize, found: usize },
}
