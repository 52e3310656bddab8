use thiserror::Error;

/// Application error taxonomy. Validation and NotFound are reported straight
/// back to the caller; External is absorbed at the orchestration boundary;
/// Persistence carries storage context.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("External service error: {0}")]
    External(String),

    #[error("Storage error: {0}")]
    Persistence(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Persistence(e.to_string())
    }
}
