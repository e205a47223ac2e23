//! Error types for TradeQuest domain types

use thiserror::Error;

/// Errors raised while constructing or parsing domain types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    /// Cycle id or label does not map to a calendar month
    #[error("Invalid cycle: {0}")]
    InvalidCycle(String),

    /// Stored notification kind is not recognised
    #[error("Unknown notification kind: {0}")]
    UnknownNotificationKind(String),

    /// Identifier failed to parse
    #[error("Invalid identifier: {0}")]
    InvalidId(String),
}

impl From<uuid::Error> for TypesError {
    fn from(e: uuid::Error) -> Self {
        TypesError::InvalidId(e.to_string())
    }
}
