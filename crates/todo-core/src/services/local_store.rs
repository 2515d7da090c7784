//! Shared local store used by the sync engine and clients.
//!
//! Wraps the libSQL database behind an async mutex and pairs every item
//! mutation with its pending-operation record inside one transaction, so a
//! mutation is never durable without the intent to deliver it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{watch, Mutex};

use crate::db::{
    Database, LibSqlPendingOperationLog, LibSqlTodoRepository, PendingOperationLog,
    TodoRepository,
};
use crate::models::{OperationPayload, PendingOperation, Priority, TodoId, TodoItem};
use crate::{Error, Result};

/// Thread-safe handle to the local todo database and pending-operation log.
///
/// Cloning is cheap; all clones share one connection and one change channel.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    changes: Arc<watch::Sender<u64>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Open (or create) a store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        tracing::debug!("Opened local store at {}", db_path.display());
        Ok(Self::from_database(db, Some(db_path)))
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::from_database(db, None))
    }

    fn from_database(db: Database, db_path: Option<PathBuf>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            db: Arc::new(Mutex::new(db)),
            changes: Arc::new(changes),
            db_path,
        }
    }

    /// Filesystem location, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Subscribe to item changes.
    ///
    /// The value is a revision counter bumped after every committed write
    /// that touches the `todos` table.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Current change revision.
    pub fn revision(&self) -> u64 {
        *self.changes.borrow()
    }

    fn notify_changed(&self) {
        self.changes.send_modify(|revision| *revision += 1);
    }

    /// Fetch an item by id.
    pub async fn get(&self, id: &TodoId) -> Result<Option<TodoItem>> {
        let db = self.db.lock().await;
        LibSqlTodoRepository::new(db.connection()).get(id).await
    }

    /// All items, newest first.
    pub async fn list_all(&self) -> Result<Vec<TodoItem>> {
        let db = self.db.lock().await;
        LibSqlTodoRepository::new(db.connection()).list_all().await
    }

    /// Items with an exact stored priority and completion flag.
    pub async fn list_by_priority(
        &self,
        priority: Priority,
        completed: bool,
    ) -> Result<Vec<TodoItem>> {
        let db = self.db.lock().await;
        LibSqlTodoRepository::new(db.connection())
            .list_by_priority(priority, completed)
            .await
    }

    /// Items by completion flag regardless of priority.
    pub async fn list_by_completion(&self, completed: bool) -> Result<Vec<TodoItem>> {
        let db = self.db.lock().await;
        LibSqlTodoRepository::new(db.connection())
            .list_by_completion(completed)
            .await
    }

    /// IDs that start with `prefix`, newest first.
    pub async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<TodoId>> {
        let db = self.db.lock().await;
        LibSqlTodoRepository::new(db.connection())
            .list_ids_by_prefix(prefix, limit)
            .await
    }

    /// Number of stored items.
    pub async fn count(&self) -> Result<usize> {
        let db = self.db.lock().await;
        LibSqlTodoRepository::new(db.connection()).count().await
    }

    /// Queued operations in replay order.
    pub async fn pending_operations(&self) -> Result<Vec<PendingOperation>> {
        let db = self.db.lock().await;
        LibSqlPendingOperationLog::new(db.connection()).list().await
    }

    /// A queued operation by sequence number, `None` once confirmed.
    pub async fn pending_operation(&self, seq: i64) -> Result<Option<PendingOperation>> {
        let db = self.db.lock().await;
        LibSqlPendingOperationLog::new(db.connection()).get(seq).await
    }

    /// Oldest queued operation after the `after` cursor.
    pub async fn next_pending_after(&self, after: i64) -> Result<Option<PendingOperation>> {
        let db = self.db.lock().await;
        LibSqlPendingOperationLog::new(db.connection())
            .next_after(after)
            .await
    }

    /// Number of queued operations.
    pub async fn pending_count(&self) -> Result<usize> {
        let db = self.db.lock().await;
        LibSqlPendingOperationLog::new(db.connection()).count().await
    }

    /// Insert a new item and queue its CREATE.
    pub async fn record_create(&self, item: &TodoItem) -> Result<PendingOperation> {
        let db = self.db.lock().await;
        let conn = db.connection();

        db.begin().await?;
        let outcome: Result<_> = async {
            LibSqlTodoRepository::new(conn).upsert(item).await?;
            LibSqlPendingOperationLog::new(conn)
                .append(&item.id, &OperationPayload::Create(item.clone()))
                .await
        }
        .await;
        let operation = db.finish(outcome).await?;

        self.notify_changed();
        Ok(operation)
    }

    /// Overwrite an existing item and queue its UPDATE.
    ///
    /// Fails with [`Error::NotFound`] (queuing nothing) when the item is gone.
    pub async fn record_update(&self, item: &TodoItem) -> Result<PendingOperation> {
        let db = self.db.lock().await;
        let conn = db.connection();

        db.begin().await?;
        let outcome: Result<_> = async {
            if !LibSqlTodoRepository::new(conn).update(item).await? {
                return Err(Error::NotFound(item.id.to_string()));
            }
            LibSqlPendingOperationLog::new(conn)
                .append(&item.id, &OperationPayload::Update(item.clone()))
                .await
        }
        .await;
        let operation = db.finish(outcome).await?;

        self.notify_changed();
        Ok(operation)
    }

    /// Remove an item and queue its DELETE.
    ///
    /// The DELETE is queued even when no local row existed, since the remote
    /// service may still hold the item.
    pub async fn record_delete(&self, id: &TodoId) -> Result<PendingOperation> {
        let db = self.db.lock().await;
        let conn = db.connection();

        db.begin().await?;
        let outcome: Result<_> = async {
            let removed = LibSqlTodoRepository::new(conn).delete(id).await?;
            let operation = LibSqlPendingOperationLog::new(conn)
                .append(id, &OperationPayload::Delete)
                .await?;
            Ok((removed, operation))
        }
        .await;
        let (removed, operation) = db.finish(outcome).await?;

        if removed {
            self.notify_changed();
        }
        Ok(operation)
    }

    /// Drop a delivered operation from the log.
    ///
    /// Returns `false` when the operation had already been confirmed.
    pub async fn confirm(&self, seq: i64) -> Result<bool> {
        let db = self.db.lock().await;
        LibSqlPendingOperationLog::new(db.connection())
            .delete(seq)
            .await
    }

    /// Confirm a CREATE and adopt the identity the remote service assigned.
    ///
    /// The local row is re-keyed to the remote id and takes the remote
    /// timestamp. When no later operation is queued for the item the remote
    /// copy replaces the row outright; otherwise the local fields are kept so
    /// a newer local edit is not rolled back. Queued operations are pointed at
    /// the remote id. A row deleted locally while the create was in flight is
    /// not brought back.
    pub async fn adopt_created(
        &self,
        seq: i64,
        local_id: &TodoId,
        remote: &TodoItem,
    ) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        db.begin().await?;
        let outcome: Result<_> = async {
            let todos = LibSqlTodoRepository::new(conn);
            let log = LibSqlPendingOperationLog::new(conn);

            log.delete(seq).await?;
            let superseded = !log.list_for_todo(local_id).await?.is_empty();
            log.retarget(local_id, &remote.id).await?;

            let Some(local) = todos.get(local_id).await? else {
                return Ok(false);
            };
            let adopted = if superseded {
                TodoItem {
                    id: remote.id.clone(),
                    created_at: remote.created_at,
                    ..local
                }
            } else {
                remote.clone()
            };
            if *local_id != adopted.id {
                todos.delete(local_id).await?;
            }
            todos.upsert(&adopted).await?;
            Ok(true)
        }
        .await;
        let changed = db.finish(outcome).await?;

        if changed {
            self.notify_changed();
        }
        Ok(())
    }

    /// Atomically replace every local item with `items`.
    ///
    /// Delete-all and bulk insert share one transaction, so readers never see
    /// the table empty midway.
    pub async fn replace_all(&self, items: &[TodoItem]) -> Result<()> {
        let db = self.db.lock().await;
        let conn = db.connection();

        db.begin().await?;
        let outcome: Result<_> = async {
            let todos = LibSqlTodoRepository::new(conn);
            todos.delete_all().await?;
            todos.insert_many(items).await
        }
        .await;
        db.finish(outcome).await?;

        self.notify_changed();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OperationType;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn record_create_writes_item_and_operation() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let item = TodoItem::new("Buy milk", Priority::Low);

        let operation = store.record_create(&item).await.unwrap();

        assert_eq!(store.get(&item.id).await.unwrap(), Some(item.clone()));
        assert_eq!(operation.operation_type(), OperationType::Create);
        assert_eq!(store.pending_operations().await.unwrap(), vec![operation]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn record_update_of_missing_item_queues_nothing() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let item = TodoItem::new("Ghost", Priority::High);

        let error = store.record_update(&item).await.unwrap_err();

        assert!(matches!(error, Error::NotFound(_)));
        assert_eq!(store.pending_count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn record_delete_queues_even_without_local_row() {
        let store = LocalStore::open_in_memory().await.unwrap();

        let operation = store.record_delete(&TodoId::new("remote-only")).await.unwrap();

        assert_eq!(operation.operation_type(), OperationType::Delete);
        assert_eq!(store.pending_count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn writes_bump_the_change_revision() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let mut changes = store.subscribe();
        let item = TodoItem::new("Buy milk", Priority::Low);

        store.record_create(&item).await.unwrap();

        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), 1);
        assert_eq!(store.revision(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn adopt_created_rekeys_row_and_queued_operations() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let mut item = TodoItem::new("Buy milk", Priority::Low);
        let create = store.record_create(&item).await.unwrap();
        item.is_completed = true;
        store.record_update(&item).await.unwrap();

        let remote = TodoItem {
            id: TodoId::new("srv-1"),
            is_completed: false,
            ..item.clone()
        };
        store
            .adopt_created(create.seq, &item.id, &remote)
            .await
            .unwrap();

        assert!(store.get(&item.id).await.unwrap().is_none());
        let adopted = store.get(&remote.id).await.unwrap().unwrap();
        assert!(adopted.is_completed, "newer local edit must survive adoption");

        let pending = store.pending_operations().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].todo_id, remote.id);
        assert_eq!(pending[0].operation_type(), OperationType::Update);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn adopt_created_takes_remote_copy_when_nothing_newer_is_queued() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let item = TodoItem::new("buy milk", Priority::Low);
        let create = store.record_create(&item).await.unwrap();

        let remote = TodoItem {
            id: TodoId::new("srv-1"),
            title: "Buy milk".to_string(),
            ..item.clone()
        };
        store
            .adopt_created(create.seq, &item.id, &remote)
            .await
            .unwrap();

        assert_eq!(store.list_all().await.unwrap(), vec![remote]);
        assert_eq!(store.pending_count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn adopt_created_does_not_resurrect_deleted_rows() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let item = TodoItem::new("Short lived", Priority::Medium);
        let create = store.record_create(&item).await.unwrap();
        store.record_delete(&item.id).await.unwrap();

        let remote = TodoItem {
            id: TodoId::new("srv-9"),
            ..item.clone()
        };
        store
            .adopt_created(create.seq, &item.id, &remote)
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 0);
        let pending = store.pending_operations().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].todo_id, remote.id);
        assert_eq!(pending[0].operation_type(), OperationType::Delete);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn replace_all_swaps_contents() {
        let store = LocalStore::open_in_memory().await.unwrap();
        store
            .record_create(&TodoItem::new("Local only", Priority::Low))
            .await
            .unwrap();

        let remote = vec![
            TodoItem::new("Remote A", Priority::High),
            TodoItem::new("Remote B", Priority::Medium),
        ];
        store.replace_all(&remote).await.unwrap();

        let mut titles = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.title)
            .collect::<Vec<_>>();
        titles.sort();
        assert_eq!(titles, vec!["Remote A", "Remote B"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_path_creates_parent_directories() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("todo.db");

        let store = LocalStore::open_path(&path).await.unwrap();

        assert!(path.exists());
        assert_eq!(store.path(), Some(path.as_path()));
    }
}
