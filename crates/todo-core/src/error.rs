//! Error types for todo-core

use thiserror::Error;

/// Result type alias using todo-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in local todo-core operations.
///
/// Remote delivery failures are not represented here; they are reported as
/// [`crate::remote::RemoteError`] and absorbed by the sync engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Todo item not found
    #[error("Todo not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
