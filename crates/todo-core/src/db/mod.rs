//! Database layer for todo-sync

mod connection;
mod migrations;
mod pending_log;
mod todo_repository;

pub use connection::Database;
pub use pending_log::{LibSqlPendingOperationLog, PendingOperationLog};
pub use todo_repository::{LibSqlTodoRepository, TodoRepository};
