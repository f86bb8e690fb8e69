//! Storage error model.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence-layer error.
///
/// Unique-constraint violations get their own variant because callers react
/// to them (duplicate registration, the admin-profile provisioning race);
/// everything else is an opaque database failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("failed to decode stored row: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let unique = err
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if unique {
            StoreError::UniqueViolation
        } else {
            StoreError::Database(err)
        }
    }
}

impl StoreError {
    pub fn decode(msg: impl Into<String>) -> Self {
        StoreError::Decode(msg.into())
    }
}
