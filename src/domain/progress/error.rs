use crate::error::AppError;
use crate::infrastructure::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ProgressServiceError {
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ProgressServiceError {
    fn from(err: StorageError) -> Self {
        ProgressServiceError::Dependency(err.to_string())
    }
}

impl From<ProgressServiceError> for AppError {
    fn from(err: ProgressServiceError) -> Self {
        match err {
            ProgressServiceError::Invalid(msg) => AppError::BadRequest(msg),
            ProgressServiceError::NotFound(msg) => AppError::NotFound(msg),
            ProgressServiceError::Dependency(msg) => AppError::Internal(msg),
        }
    }
}
