use diesel::result::Error as DieselError;
use thiserror::Error;

/// Custom error type for target-aggregate operations
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The validator rejected a computed aggregate state. The stored row is
    /// untouched when this surfaces.
    #[error("Integrity violation: {}", .0.join("; "))]
    IntegrityViolation(Vec<String>),

    /// The exclusive row lock could not be acquired within the retry budget
    #[error("Lock conflict after {attempts} attempts")]
    LockConflict { attempts: u32 },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<DieselError> for TargetError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => TargetError::NotFound("Record not found".to_string()),
            _ => TargetError::DatabaseError(err.to_string()),
        }
    }
}

/// Result type for target operations
pub type Result<T> = std::result::Result<T, TargetError>;
