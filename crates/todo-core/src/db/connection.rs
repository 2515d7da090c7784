//! Database connection management

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations;

/// Database wrapper for a local libSQL connection
pub struct Database {
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        Self::build(&path_str).await
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Self::build(":memory:").await
    }

    async fn build(location: &str) -> Result<Self> {
        let db = Builder::new_local(location).build().await?;
        let conn = db.connect()?;

        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Configure `SQLite` for durable local writes
    async fn configure(&self) -> Result<()> {
        // WAL is unavailable for in-memory databases; ignore failures there
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Start a write transaction.
    ///
    /// Pair every call with [`Database::finish`].
    pub async fn begin(&self) -> Result<()> {
        self.conn.execute("BEGIN IMMEDIATE", ()).await?;
        Ok(())
    }

    /// Commit when `outcome` is `Ok`, roll back otherwise.
    pub async fn finish<T>(&self, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                if let Err(error) = self.conn.execute("COMMIT", ()).await {
                    self.conn.execute("ROLLBACK", ()).await.ok();
                    return Err(error.into());
                }
                Ok(value)
            }
            Err(error) => {
                self.conn.execute("ROLLBACK", ()).await.ok();
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn count_rows(db: &Database) -> i64 {
        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM todos", ())
            .await
            .unwrap();
        rows.next().await.unwrap().unwrap().get::<i64>(0).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(count_rows(&db).await, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_file_persists_across_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("todo.db");

        {
            let db = Database::open(&path).await.unwrap();
            db.connection()
                .execute(
                    "INSERT INTO todos (id, title, priority, is_completed, created_at) VALUES ('a', 'A', 'LOW', 0, 1)",
                    (),
                )
                .await
                .unwrap();
        }

        let reopened = Database::open(&path).await.unwrap();
        assert_eq!(count_rows(&reopened).await, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_finish_rolls_back_on_error() {
        let db = Database::open_in_memory().await.unwrap();

        db.begin().await.unwrap();
        let outcome: Result<()> = async {
            db.connection()
                .execute(
                    "INSERT INTO todos (id, title, priority, is_completed, created_at) VALUES ('a', 'A', 'LOW', 0, 1)",
                    (),
                )
                .await?;
            Err(crate::Error::InvalidInput("abort".into()))
        }
        .await;

        assert!(db.finish(outcome).await.is_err());
        assert_eq!(count_rows(&db).await, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_finish_commits_on_success() {
        let db = Database::open_in_memory().await.unwrap();

        db.begin().await.unwrap();
        let outcome: Result<u64> = async {
            Ok(db
                .connection()
                .execute(
                    "INSERT INTO todos (id, title, priority, is_completed, created_at) VALUES ('a', 'A', 'LOW', 0, 1)",
                    (),
                )
                .await?)
        }
        .await;

        assert_eq!(db.finish(outcome).await.unwrap(), 1);
        assert_eq!(count_rows(&db).await, 1);
    }
}
