//! Pending (not yet server-confirmed) operation model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::todo::{TodoId, TodoItem};
use crate::error::{Error, Result};

/// Kind of mutation recorded in the pending-operation log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Create,
    Update,
    Delete,
}

impl OperationType {
    /// Storage name (`CREATE`, `UPDATE`, `DELETE`)
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(Error::Database(format!("Unknown operation type: {other}"))),
        }
    }
}

/// What a pending operation intends to do, carrying only the data it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationPayload {
    /// Create the item on the remote service
    Create(TodoItem),
    /// Overwrite the remote item with this snapshot
    Update(TodoItem),
    /// Delete the remote item
    Delete,
}

impl OperationPayload {
    pub const fn operation_type(&self) -> OperationType {
        match self {
            Self::Create(_) => OperationType::Create,
            Self::Update(_) => OperationType::Update,
            Self::Delete => OperationType::Delete,
        }
    }

    /// Snapshot carried by the payload, if any
    pub const fn snapshot(&self) -> Option<&TodoItem> {
        match self {
            Self::Create(item) | Self::Update(item) => Some(item),
            Self::Delete => None,
        }
    }

    /// Encode the payload into its stored `todo_data` column.
    ///
    /// Deletes are stored with an empty payload.
    pub fn encode(&self) -> Result<String> {
        self.snapshot()
            .map_or_else(|| Ok(String::new()), TodoItem::to_snapshot)
    }

    /// Rebuild a payload from its stored `(operation_type, todo_data)` columns.
    pub fn decode(operation_type: OperationType, todo_data: &str) -> Result<Self> {
        match operation_type {
            OperationType::Create => Ok(Self::Create(TodoItem::from_snapshot(todo_data)?)),
            OperationType::Update => Ok(Self::Update(TodoItem::from_snapshot(todo_data)?)),
            OperationType::Delete => Ok(Self::Delete),
        }
    }
}

/// A locally recorded mutation the remote service has not confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    /// Monotonic local sequence number; ascending order is replay order
    pub seq: i64,
    /// Item this operation targets
    pub todo_id: TodoId,
    pub payload: OperationPayload,
    /// When the operation was recorded (Unix ms)
    pub created_at: i64,
}

impl PendingOperation {
    pub const fn operation_type(&self) -> OperationType {
        self.payload.operation_type()
    }
}
