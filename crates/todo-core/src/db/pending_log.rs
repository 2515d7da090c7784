//! Pending-operation log: an append-only journal of unconfirmed mutations

use crate::error::Result;
use crate::models::{OperationPayload, OperationType, PendingOperation, TodoId};
use libsql::{params, Connection, Row};

const PENDING_COLUMNS: &str = "seq, operation_type, todo_id, todo_data, created_at";

/// Trait for pending-operation storage (async)
///
/// A dumb journal ordered by insertion sequence: no merging, no compaction.
#[allow(async_fn_in_trait)]
pub trait PendingOperationLog {
    /// Append an operation and return it with its assigned sequence number
    async fn append(&self, todo_id: &TodoId, payload: &OperationPayload)
        -> Result<PendingOperation>;

    /// All operations in ascending sequence order
    async fn list(&self) -> Result<Vec<PendingOperation>>;

    /// One operation by sequence number, if still queued
    async fn get(&self, seq: i64) -> Result<Option<PendingOperation>>;

    /// Oldest operation with a sequence number above `after`
    async fn next_after(&self, after: i64) -> Result<Option<PendingOperation>>;

    /// Operations targeting one item, in ascending sequence order
    async fn list_for_todo(&self, todo_id: &TodoId) -> Result<Vec<PendingOperation>>;

    /// Number of queued operations
    async fn count(&self) -> Result<usize>;

    /// Remove one operation; returns `false` when it was already gone
    async fn delete(&self, seq: i64) -> Result<bool>;

    /// Point the queued operations of `from` at `to`, rewriting their snapshots
    async fn retarget(&self, from: &TodoId, to: &TodoId) -> Result<u64>;
}

/// libSQL implementation of `PendingOperationLog`
pub struct LibSqlPendingOperationLog<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlPendingOperationLog<'a> {
    /// Create a new log with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_operation(row: &Row) -> Result<PendingOperation> {
        let operation_type: OperationType = row.get::<String>(1)?.parse()?;
        let todo_data: String = row.get(3)?;
        Ok(PendingOperation {
            seq: row.get(0)?,
            todo_id: TodoId::new(row.get::<String>(2)?),
            payload: OperationPayload::decode(operation_type, &todo_data)?,
            created_at: row.get(4)?,
        })
    }

    async fn query_operations(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<PendingOperation>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut operations = Vec::new();
        while let Some(row) = rows.next().await? {
            operations.push(Self::parse_operation(&row)?);
        }
        Ok(operations)
    }
}

impl PendingOperationLog for LibSqlPendingOperationLog<'_> {
    async fn append(
        &self,
        todo_id: &TodoId,
        payload: &OperationPayload,
    ) -> Result<PendingOperation> {
        let created_at = chrono::Utc::now().timestamp_millis();
        let todo_data = payload.encode()?;

        self.conn
            .execute(
                "INSERT INTO pending_operations (operation_type, todo_id, todo_data, created_at)
                 VALUES (?, ?, ?, ?)",
                params![
                    payload.operation_type().as_str(),
                    todo_id.as_str(),
                    todo_data,
                    created_at
                ],
            )
            .await?;

        Ok(PendingOperation {
            seq: self.conn.last_insert_rowid(),
            todo_id: todo_id.clone(),
            payload: payload.clone(),
            created_at,
        })
    }

    async fn list(&self) -> Result<Vec<PendingOperation>> {
        self.query_operations(
            &format!("SELECT {PENDING_COLUMNS} FROM pending_operations ORDER BY seq ASC"),
            (),
        )
        .await
    }

    async fn get(&self, seq: i64) -> Result<Option<PendingOperation>> {
        let operations = self
            .query_operations(
                &format!("SELECT {PENDING_COLUMNS} FROM pending_operations WHERE seq = ?"),
                [seq],
            )
            .await?;
        Ok(operations.into_iter().next())
    }

    async fn next_after(&self, after: i64) -> Result<Option<PendingOperation>> {
        let operations = self
            .query_operations(
                &format!(
                    "SELECT {PENDING_COLUMNS} FROM pending_operations
                     WHERE seq > ? ORDER BY seq ASC LIMIT 1"
                ),
                [after],
            )
            .await?;
        Ok(operations.into_iter().next())
    }

    async fn list_for_todo(&self, todo_id: &TodoId) -> Result<Vec<PendingOperation>> {
        self.query_operations(
            &format!(
                "SELECT {PENDING_COLUMNS} FROM pending_operations WHERE todo_id = ? ORDER BY seq ASC"
            ),
            [todo_id.as_str()],
        )
        .await
    }

    async fn count(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM pending_operations", ())
            .await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn delete(&self, seq: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM pending_operations WHERE seq = ?", [seq])
            .await?;
        Ok(rows > 0)
    }

    async fn retarget(&self, from: &TodoId, to: &TodoId) -> Result<u64> {
        if from == to {
            return Ok(0);
        }

        let mut updated = 0;
        for operation in self.list_for_todo(from).await? {
            let payload = match operation.payload {
                OperationPayload::Create(mut item) => {
                    item.id = to.clone();
                    OperationPayload::Create(item)
                }
                OperationPayload::Update(mut item) => {
                    item.id = to.clone();
                    OperationPayload::Update(item)
                }
                OperationPayload::Delete => OperationPayload::Delete,
            };

            updated += self
                .conn
                .execute(
                    "UPDATE pending_operations SET todo_id = ?, todo_data = ? WHERE seq = ?",
                    params![to.as_str(), payload.encode()?, operation.seq],
                )
                .await?;
        }
        Ok(updated)
    }
}
