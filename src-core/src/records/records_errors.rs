use diesel::result::Error as DieselError;
use thiserror::Error;

/// Custom error type for business-record queries
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DieselError> for RecordError {
    fn from(err: DieselError) -> Self {
        RecordError::DatabaseError(err.to_string())
    }
}

/// Result type for record operations
pub type Result<T> = std::result::Result<T, RecordError>;
