//! Remote todo service clients.
//!
//! [`TodoApi`] is the seam between the sync engine and whatever holds the
//! authoritative copy of the list. The engine only ever talks to
//! `Arc<dyn TodoApi>`, so the HTTP client, the offline stub, and the
//! in-memory double are interchangeable.

mod http;
mod memory;

use async_trait::async_trait;

use crate::models::{TodoId, TodoItem};

pub use http::HttpTodoApi;
pub use memory::{InMemoryTodoApi, RemoteCall};

/// Result alias for remote calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Failures reported by a remote todo service.
///
/// Every variant is treated the same by the sync engine: the operation stays
/// queued and is retried by a later drain.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// No remote endpoint is configured
    #[error("No remote endpoint configured")]
    NotConfigured,

    /// Transport failure (DNS, connect, timeout, TLS)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Remote service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The service answered with a body that is not a valid todo payload
    #[error("Invalid remote payload: {0}")]
    InvalidPayload(String),

    /// The service is unreachable
    #[error("Remote service unavailable: {0}")]
    Unavailable(String),
}

impl RemoteError {
    /// True when the service reported that the target item does not exist.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, .. })
    }
}

/// Operations offered by the remote todo service.
#[async_trait]
pub trait TodoApi: Send + Sync {
    /// Fetch the full authoritative list
    async fn list_all(&self) -> RemoteResult<Vec<TodoItem>>;

    /// Fetch one item
    async fn get(&self, id: &TodoId) -> RemoteResult<TodoItem>;

    /// Create an item; the returned copy carries the server's id and timestamp
    async fn create(&self, item: &TodoItem) -> RemoteResult<TodoItem>;

    /// Overwrite an item; `None` when the service answered without a body
    async fn update(&self, id: &TodoId, item: &TodoItem) -> RemoteResult<Option<TodoItem>>;

    /// Delete an item
    async fn delete(&self, id: &TodoId) -> RemoteResult<()>;
}

/// Stand-in used when no endpoint is configured.
///
/// Every call fails with [`RemoteError::NotConfigured`], so mutations stay
/// queued until a real endpoint is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineTodoApi;

#[async_trait]
impl TodoApi for OfflineTodoApi {
    async fn list_all(&self) -> RemoteResult<Vec<TodoItem>> {
        Err(RemoteError::NotConfigured)
    }

    async fn get(&self, _id: &TodoId) -> RemoteResult<TodoItem> {
        Err(RemoteError::NotConfigured)
    }

    async fn create(&self, _item: &TodoItem) -> RemoteResult<TodoItem> {
        Err(RemoteError::NotConfigured)
    }

    async fn update(&self, _id: &TodoId, _item: &TodoItem) -> RemoteResult<Option<TodoItem>> {
        Err(RemoteError::NotConfigured)
    }

    async fn delete(&self, _id: &TodoId) -> RemoteResult<()> {
        Err(RemoteError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    #[test]
    fn not_found_is_only_http_404() {
        let not_found = RemoteError::Api {
            status: 404,
            message: String::new(),
        };
        let server_error = RemoteError::Api {
            status: 500,
            message: String::new(),
        };

        assert!(not_found.is_not_found());
        assert!(!server_error.is_not_found());
        assert!(!RemoteError::NotConfigured.is_not_found());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_api_rejects_every_call() {
        let api = OfflineTodoApi;
        let item = TodoItem::new("Buy milk", Priority::Low);

        assert!(matches!(
            api.create(&item).await,
            Err(RemoteError::NotConfigured)
        ));
        assert!(matches!(
            api.list_all().await,
            Err(RemoteError::NotConfigured)
        ));
        assert!(matches!(
            api.delete(&item.id).await,
            Err(RemoteError::NotConfigured)
        ));
    }
}
