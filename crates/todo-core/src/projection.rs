//! Filtered, sorted views of the local store.
//!
//! A view never queries the remote service; it re-reads the store whenever
//! the store reports a change.

use tokio::sync::watch;

use crate::models::{Priority, TodoItem};
use crate::services::LocalStore;
use crate::{Error, Result};

/// Selector plus free-text query for a list of items.
///
/// `Priority::Completed` selects every completed item. Any other priority
/// selects items with exactly that priority that are not yet completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoFilter {
    pub priority: Priority,
    pub query: String,
}

impl TodoFilter {
    pub fn new(priority: Priority) -> Self {
        Self {
            priority,
            query: String::new(),
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Whether `item` belongs in this view.
    pub fn matches(&self, item: &TodoItem) -> bool {
        let selected = match self.priority {
            Priority::Completed => item.is_completed,
            priority => item.priority == priority && !item.is_completed,
        };
        selected && self.matches_query(item)
    }

    /// Whether the title matches the query alone, ignoring the selector.
    pub fn matches_query(&self, item: &TodoItem) -> bool {
        let query = self.query.trim();
        query.is_empty() || item.title.to_lowercase().contains(&query.to_lowercase())
    }

    /// Apply the filter to `items`, newest first.
    pub fn apply(&self, items: impl IntoIterator<Item = TodoItem>) -> Vec<TodoItem> {
        let mut selected = items
            .into_iter()
            .filter(|item| self.matches(item))
            .collect::<Vec<_>>();
        selected.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        selected
    }

    /// Read the matching items from `store`.
    pub async fn load(&self, store: &LocalStore) -> Result<Vec<TodoItem>> {
        let candidates = match self.priority {
            Priority::Completed => store.list_by_completion(true).await?,
            priority => store.list_by_priority(priority, false).await?,
        };
        Ok(self.apply(candidates))
    }
}

/// A live, filtered view that follows store changes.
pub struct TodoView {
    store: LocalStore,
    filter: TodoFilter,
    changes: watch::Receiver<u64>,
}

impl TodoView {
    pub fn new(store: LocalStore, filter: TodoFilter) -> Self {
        let changes = store.subscribe();
        Self {
            store,
            filter,
            changes,
        }
    }

    pub const fn filter(&self) -> &TodoFilter {
        &self.filter
    }

    /// Change the selector or query; the next read reflects it.
    pub fn set_filter(&mut self, filter: TodoFilter) {
        self.filter = filter;
    }

    /// Current contents of the view.
    pub async fn current(&mut self) -> Result<Vec<TodoItem>> {
        self.changes.borrow_and_update();
        self.filter.load(&self.store).await
    }

    /// Wait for the next store change, then return the refreshed contents.
    pub async fn changed(&mut self) -> Result<Vec<TodoItem>> {
        self.changes
            .changed()
            .await
            .map_err(|_| Error::Database("local store closed".to_string()))?;
        self.current().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{timestamp_from_millis, TodoId};
    use pretty_assertions::assert_eq;

    fn item(id: &str, title: &str, priority: Priority, completed: bool, at: i64) -> TodoItem {
        TodoItem {
            id: TodoId::new(id),
            title: title.to_string(),
            priority,
            is_completed: completed,
            created_at: timestamp_from_millis(at).unwrap(),
        }
    }

    fn ids(items: &[TodoItem]) -> Vec<&str> {
        items.iter().map(|item| item.id.as_str()).collect()
    }

    #[test]
    fn completed_selector_ignores_priority() {
        let items = vec![
            item("a", "Low done", Priority::Low, true, 1_000),
            item("b", "High open", Priority::High, false, 2_000),
            item("c", "High done", Priority::High, true, 3_000),
        ];

        let view = TodoFilter::new(Priority::Completed).apply(items);

        assert_eq!(ids(&view), vec!["c", "a"]);
    }

    #[test]
    fn priority_selector_hides_completed_items() {
        let items = vec![
            item("a", "Open", Priority::High, false, 1_000),
            item("b", "Done", Priority::High, true, 2_000),
            item("c", "Other", Priority::Low, false, 3_000),
        ];

        let view = TodoFilter::new(Priority::High).apply(items);

        assert_eq!(ids(&view), vec!["a"]);
    }

    #[test]
    fn query_is_case_insensitive_substring() {
        let items = vec![
            item("a", "Buy MILK", Priority::Medium, false, 1_000),
            item("b", "Walk dog", Priority::Medium, false, 2_000),
        ];

        let view = TodoFilter::new(Priority::Medium)
            .with_query("milk")
            .apply(items.clone());
        assert_eq!(ids(&view), vec!["a"]);

        let blank = TodoFilter::new(Priority::Medium).with_query("   ").apply(items);
        assert_eq!(ids(&blank), vec!["b", "a"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn view_follows_store_changes() {
        let store = LocalStore::open_in_memory().await.unwrap();
        let mut view = TodoView::new(store.clone(), TodoFilter::new(Priority::Low));
        assert!(view.current().await.unwrap().is_empty());

        let item = TodoItem::new("Buy milk", Priority::Low);
        let writer = store.clone();
        let pending = item.clone();
        tokio::spawn(async move {
            writer.record_create(&pending).await.unwrap();
        });

        let refreshed = view.changed().await.unwrap();
        assert_eq!(refreshed, vec![item]);
    }
}
