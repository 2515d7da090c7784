//! Data models for todo-sync

mod pending;
mod todo;

pub use pending::{OperationPayload, OperationType, PendingOperation};
pub use todo::{
    format_wire_timestamp, parse_wire_timestamp, timestamp_from_millis, Priority, TodoId, TodoItem,
};
