//! Todo item repository implementation

use crate::error::Result;
use crate::models::{timestamp_from_millis, Priority, TodoId, TodoItem};
use libsql::{params, Connection, Row};

const TODO_COLUMNS: &str = "id, title, priority, is_completed, created_at";

/// Trait for todo row storage operations (async)
#[allow(async_fn_in_trait)]
pub trait TodoRepository {
    /// Get an item by ID
    async fn get(&self, id: &TodoId) -> Result<Option<TodoItem>>;

    /// List every item, newest first
    async fn list_all(&self) -> Result<Vec<TodoItem>>;

    /// List items with the given stored priority and completion flag
    async fn list_by_priority(&self, priority: Priority, completed: bool) -> Result<Vec<TodoItem>>;

    /// List items by completion flag regardless of priority
    async fn list_by_completion(&self, completed: bool) -> Result<Vec<TodoItem>>;

    /// IDs starting with `prefix`, newest first
    async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<TodoId>>;

    /// Insert an item, replacing any row with the same ID
    async fn upsert(&self, item: &TodoItem) -> Result<()>;

    /// Insert many items, replacing rows with the same IDs
    async fn insert_many(&self, items: &[TodoItem]) -> Result<()>;

    /// Overwrite an existing row; returns `false` when no row matched
    async fn update(&self, item: &TodoItem) -> Result<bool>;

    /// Delete a row; returns `false` when no row matched
    async fn delete(&self, id: &TodoId) -> Result<bool>;

    /// Delete every row, returning how many were removed
    async fn delete_all(&self) -> Result<u64>;

    /// Number of stored items
    async fn count(&self) -> Result<usize>;
}

/// libSQL implementation of `TodoRepository`
pub struct LibSqlTodoRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlTodoRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse an item from a database row
    fn parse_item(row: &Row) -> Result<TodoItem> {
        let id: String = row.get(0)?;
        let priority: String = row.get(2)?;
        Ok(TodoItem {
            id: TodoId::new(id),
            title: row.get(1)?,
            priority: priority.parse()?,
            is_completed: row.get::<i64>(3)? != 0,
            created_at: timestamp_from_millis(row.get(4)?)?,
        })
    }

    async fn query_items(&self, sql: &str, params: impl libsql::params::IntoParams) -> Result<Vec<TodoItem>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(Self::parse_item(&row)?);
        }
        Ok(items)
    }
}

impl TodoRepository for LibSqlTodoRepository<'_> {
    async fn get(&self, id: &TodoId) -> Result<Option<TodoItem>> {
        let items = self
            .query_items(
                &format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?"),
                [id.as_str()],
            )
            .await?;
        Ok(items.into_iter().next())
    }

    async fn list_all(&self) -> Result<Vec<TodoItem>> {
        self.query_items(
            &format!("SELECT {TODO_COLUMNS} FROM todos ORDER BY created_at DESC, id ASC"),
            (),
        )
        .await
    }

    async fn list_by_priority(&self, priority: Priority, completed: bool) -> Result<Vec<TodoItem>> {
        self.query_items(
            &format!(
                "SELECT {TODO_COLUMNS} FROM todos
                 WHERE priority = ? AND is_completed = ?
                 ORDER BY created_at DESC, id ASC"
            ),
            params![priority.as_str(), i64::from(completed)],
        )
        .await
    }

    async fn list_by_completion(&self, completed: bool) -> Result<Vec<TodoItem>> {
        self.query_items(
            &format!(
                "SELECT {TODO_COLUMNS} FROM todos
                 WHERE is_completed = ?
                 ORDER BY created_at DESC, id ASC"
            ),
            [i64::from(completed)],
        )
        .await
    }

    async fn list_ids_by_prefix(&self, prefix: &str, limit: usize) -> Result<Vec<TodoId>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = self
            .conn
            .query(
                "SELECT id FROM todos
                 WHERE instr(id, ?) = 1
                 ORDER BY created_at DESC
                 LIMIT ?",
                params![prefix, limit],
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(TodoId::new(row.get::<String>(0)?));
        }
        Ok(ids)
    }

    async fn upsert(&self, item: &TodoItem) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT OR REPLACE INTO todos ({TODO_COLUMNS}) VALUES (?, ?, ?, ?, ?)"),
                params![
                    item.id.as_str(),
                    item.title.as_str(),
                    item.priority.as_str(),
                    i64::from(item.is_completed),
                    item.created_at_millis()
                ],
            )
            .await?;
        Ok(())
    }

    async fn insert_many(&self, items: &[TodoItem]) -> Result<()> {
        for item in items {
            self.upsert(item).await?;
        }
        Ok(())
    }

    async fn update(&self, item: &TodoItem) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "UPDATE todos SET title = ?, priority = ?, is_completed = ?, created_at = ? WHERE id = ?",
                params![
                    item.title.as_str(),
                    item.priority.as_str(),
                    i64::from(item.is_completed),
                    item.created_at_millis(),
                    item.id.as_str()
                ],
            )
            .await?;
        Ok(rows > 0)
    }

    async fn delete(&self, id: &TodoId) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM todos WHERE id = ?", [id.as_str()])
            .await?;
        Ok(rows > 0)
    }

    async fn delete_all(&self) -> Result<u64> {
        Ok(self.conn.execute("DELETE FROM todos", ()).await?)
    }

    async fn count(&self) -> Result<usize> {
        let mut rows = self.conn.query("SELECT COUNT(*) FROM todos", ()).await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn item(id: &str, title: &str, priority: Priority, completed: bool, created_at: i64) -> TodoItem {
        TodoItem {
            id: TodoId::new(id),
            title: title.to_string(),
            priority,
            is_completed: completed,
            created_at: timestamp_from_millis(created_at).unwrap(),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_and_get() {
        let db = setup().await;
        let repo = LibSqlTodoRepository::new(db.connection());

        let original = item("a", "Buy milk", Priority::Low, false, 1_000);
        repo.upsert(&original).await.unwrap();

        let fetched = repo.get(&original.id).await.unwrap().unwrap();
        assert_eq!(fetched, original);
        assert!(repo.get(&TodoId::new("missing")).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_all_newest_first() {
        let db = setup().await;
        let repo = LibSqlTodoRepository::new(db.connection());

        repo.upsert(&item("a", "Old", Priority::Low, false, 1_000)).await.unwrap();
        repo.upsert(&item("b", "New", Priority::High, true, 3_000)).await.unwrap();
        repo.upsert(&item("c", "Mid", Priority::Medium, false, 2_000)).await.unwrap();

        let titles = repo
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|todo| todo.title)
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["New", "Mid", "Old"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_by_priority_and_completion() {
        let db = setup().await;
        let repo = LibSqlTodoRepository::new(db.connection());

        repo.insert_many(&[
            item("a", "High open", Priority::High, false, 1_000),
            item("b", "High done", Priority::High, true, 2_000),
            item("c", "Low done", Priority::Low, true, 3_000),
        ])
        .await
        .unwrap();

        let open_high = repo.list_by_priority(Priority::High, false).await.unwrap();
        assert_eq!(open_high.len(), 1);
        assert_eq!(open_high[0].id.as_str(), "a");

        let done = repo.list_by_completion(true).await.unwrap();
        let ids = done.iter().map(|todo| todo.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_reports_missing_rows() {
        let db = setup().await;
        let repo = LibSqlTodoRepository::new(db.connection());

        let mut todo = item("a", "Draft", Priority::Medium, false, 1_000);
        assert!(!repo.update(&todo).await.unwrap());

        repo.upsert(&todo).await.unwrap();
        todo.title = "Final".to_string();
        assert!(repo.update(&todo).await.unwrap());
        assert_eq!(repo.get(&todo.id).await.unwrap().unwrap().title, "Final");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete_and_delete_all() {
        let db = setup().await;
        let repo = LibSqlTodoRepository::new(db.connection());

        repo.insert_many(&[
            item("a", "One", Priority::Low, false, 1_000),
            item("b", "Two", Priority::Low, false, 2_000),
            item("c", "Three", Priority::Low, false, 3_000),
        ])
        .await
        .unwrap();

        assert!(repo.delete(&TodoId::new("a")).await.unwrap());
        assert!(!repo.delete(&TodoId::new("a")).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 2);

        assert_eq!(repo.delete_all().await.unwrap(), 2);
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_ids_by_prefix() {
        let db = setup().await;
        let repo = LibSqlTodoRepository::new(db.connection());

        repo.insert_many(&[
            item("abc-1", "One", Priority::Low, false, 1_000),
            item("abc-2", "Two", Priority::Low, false, 2_000),
            item("xyz", "Three", Priority::Low, false, 3_000),
        ])
        .await
        .unwrap();

        let ids = repo.list_ids_by_prefix("abc", 10).await.unwrap();
        assert_eq!(ids, vec![TodoId::new("abc-2"), TodoId::new("abc-1")]);
        assert!(repo.list_ids_by_prefix("%", 10).await.unwrap().is_empty());
    }
}
