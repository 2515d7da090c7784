use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] todo_core::Error),
    #[error(transparent)]
    Remote(#[from] todo_core::RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No title provided")]
    EmptyTitle,
    #[error("Todo ID cannot be empty")]
    EmptyTodoId,
    #[error("Todo not found for id/prefix: {0}")]
    TodoNotFound(String),
    #[error("{0}")]
    AmbiguousTodoId(String),
    #[error("Nothing to change; pass --title and/or --priority")]
    NothingToEdit,
    #[error("Configuration error: {0}")]
    Config(String),
}
