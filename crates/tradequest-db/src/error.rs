//! Database error types

use thiserror::Error;

use tradequest_league::StoreError;
use tradequest_types::TypesError;

/// Database operation errors
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Guarded write found the row in a different state than expected
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A stored row could not be turned back into a domain value
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

impl From<TypesError> for DbError {
    fn from(e: TypesError) -> Self {
        DbError::CorruptRow(e.to_string())
    }
}

impl From<uuid::Error> for DbError {
    fn from(e: uuid::Error) -> Self {
        DbError::CorruptRow(e.to_string())
    }
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Connection(msg) => StoreError::Unavailable(msg),
            DbError::Query(
                err @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)),
            ) => StoreError::Unavailable(err.to_string()),
            DbError::NotFound(msg) => StoreError::NotFound(msg),
            DbError::Conflict(msg) => StoreError::Conflict(msg),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;
