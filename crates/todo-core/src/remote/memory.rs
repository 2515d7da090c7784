//! In-process todo service for tests and demos.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{RemoteError, RemoteResult, TodoApi};
use crate::models::{TodoId, TodoItem};

/// A call observed by [`InMemoryTodoApi`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    ListAll,
    Get(TodoId),
    Create(TodoId),
    Update(TodoId),
    Delete(TodoId),
}

#[derive(Debug)]
struct ServiceState {
    items: Vec<TodoItem>,
    reachable: bool,
    failing: HashSet<TodoId>,
    calls: Vec<RemoteCall>,
    id_prefix: Option<String>,
    next_id: u64,
    stamp: Option<DateTime<Utc>>,
    latency: Option<Duration>,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            reachable: true,
            failing: HashSet::new(),
            calls: Vec::new(),
            id_prefix: None,
            next_id: 1,
            stamp: None,
            latency: None,
        }
    }
}

/// Remote service double that keeps its list in memory.
///
/// Supports toggling reachability, failing calls for specific items,
/// server-side id assignment, and a log of every call received. Clones share
/// state, so a test can keep one handle while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTodoApi {
    state: Arc<Mutex<ServiceState>>,
}

impl InMemoryTodoApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the service's list.
    pub fn seed(&self, items: impl IntoIterator<Item = TodoItem>) {
        self.state().items = items.into_iter().collect();
    }

    /// Current service-side list in insertion order.
    pub fn items(&self) -> Vec<TodoItem> {
        self.state().items.clone()
    }

    /// Make every subsequent call succeed or fail with `Unavailable`.
    pub fn set_reachable(&self, reachable: bool) {
        self.state().reachable = reachable;
    }

    /// Fail every call that targets `id` until [`Self::clear_failures`].
    pub fn fail_for(&self, id: impl Into<TodoId>) {
        self.state().failing.insert(id.into());
    }

    pub fn clear_failures(&self) {
        self.state().failing.clear();
    }

    /// Assign `"{prefix}{n}"` ids to created items instead of keeping the
    /// client's id.
    pub fn assign_ids(&self, prefix: impl Into<String>) {
        self.state().id_prefix = Some(prefix.into());
    }

    /// Overwrite `createdAt` of created items with a canonical server time.
    pub fn stamp_created_at(&self, at: DateTime<Utc>) {
        self.state().stamp = Some(at);
    }

    /// Delay every call by `latency` before it is answered.
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = Some(latency);
    }

    /// Calls received so far, including failed ones.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state().calls.clone()
    }

    /// Record a call and decide whether it is answered.
    async fn admit(&self, call: RemoteCall) -> RemoteResult<()> {
        let latency = self.state().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state();
        let target = match &call {
            RemoteCall::ListAll => None,
            RemoteCall::Get(id)
            | RemoteCall::Create(id)
            | RemoteCall::Update(id)
            | RemoteCall::Delete(id) => Some(id.clone()),
        };
        state.calls.push(call);

        if !state.reachable {
            return Err(RemoteError::Unavailable("service offline".to_string()));
        }
        if let Some(id) = target.filter(|id| state.failing.contains(id)) {
            return Err(RemoteError::Api {
                status: 503,
                message: format!("injected failure for {id}"),
            });
        }
        Ok(())
    }
}

fn not_found(id: &TodoId) -> RemoteError {
    RemoteError::Api {
        status: 404,
        message: format!("todo {id} not found"),
    }
}

#[async_trait]
impl TodoApi for InMemoryTodoApi {
    async fn list_all(&self) -> RemoteResult<Vec<TodoItem>> {
        self.admit(RemoteCall::ListAll).await?;
        Ok(self.items())
    }

    async fn get(&self, id: &TodoId) -> RemoteResult<TodoItem> {
        self.admit(RemoteCall::Get(id.clone())).await?;
        self.state()
            .items
            .iter()
            .find(|item| item.id == *id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn create(&self, item: &TodoItem) -> RemoteResult<TodoItem> {
        self.admit(RemoteCall::Create(item.id.clone())).await?;

        let mut state = self.state();
        let mut created = item.clone();
        if let Some(prefix) = state.id_prefix.clone() {
            created.id = TodoId::new(format!("{prefix}{}", state.next_id));
            state.next_id += 1;
        }
        if let Some(stamp) = state.stamp {
            created.created_at = stamp;
        }

        match state.items.iter_mut().find(|existing| existing.id == created.id) {
            Some(existing) => *existing = created.clone(),
            None => state.items.push(created.clone()),
        }
        Ok(created)
    }

    async fn update(&self, id: &TodoId, item: &TodoItem) -> RemoteResult<Option<TodoItem>> {
        self.admit(RemoteCall::Update(id.clone())).await?;

        let mut state = self.state();
        let existing = state
            .items
            .iter_mut()
            .find(|existing| existing.id == *id)
            .ok_or_else(|| not_found(id))?;
        *existing = TodoItem {
            id: id.clone(),
            ..item.clone()
        };
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, id: &TodoId) -> RemoteResult<()> {
        self.admit(RemoteCall::Delete(id.clone())).await?;

        let mut state = self.state();
        let before = state.items.len();
        state.items.retain(|item| item.id != *id);
        if state.items.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use pretty_assertions::assert_eq;

    #[tokio::test(flavor = "multi_thread")]
    async fn create_assigns_ids_when_configured() {
        let api = InMemoryTodoApi::new();
        api.assign_ids("srv-");

        let first = api.create(&TodoItem::new("One", Priority::Low)).await.unwrap();
        let second = api.create(&TodoItem::new("Two", Priority::Low)).await.unwrap();

        assert_eq!(first.id, TodoId::new("srv-1"));
        assert_eq!(second.id, TodoId::new("srv-2"));
        assert_eq!(api.items().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_service_logs_and_rejects_calls() {
        let api = InMemoryTodoApi::new();
        api.set_reachable(false);
        let item = TodoItem::new("One", Priority::Low);

        let error = api.create(&item).await.unwrap_err();

        assert!(matches!(error, RemoteError::Unavailable(_)));
        assert_eq!(api.calls(), vec![RemoteCall::Create(item.id)]);
        assert!(api.items().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn injected_failures_target_single_items() {
        let api = InMemoryTodoApi::new();
        let good = TodoItem::new("Good", Priority::Low);
        let bad = TodoItem::new("Bad", Priority::Low);
        api.fail_for(bad.id.clone());

        assert!(api.create(&good).await.is_ok());
        assert!(api.create(&bad).await.is_err());

        api.clear_failures();
        assert!(api.create(&bad).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_and_delete_of_missing_items_are_not_found() {
        let api = InMemoryTodoApi::new();
        let item = TodoItem::new("Ghost", Priority::Low);

        assert!(api.update(&item.id, &item).await.unwrap_err().is_not_found());
        assert!(api.delete(&item.id).await.unwrap_err().is_not_found());
    }
}
