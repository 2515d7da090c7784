//! Offline-first sync engine.
//!
//! Every user mutation is applied to the local store and queued in the
//! pending-operation log in one transaction, then a best-effort delivery is
//! started in the background. Operations leave the log only when the remote
//! service confirms them; anything else waits for the next drain.

mod delivery;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Mutex, RwLock, Semaphore};
use tokio::task::JoinSet;

use crate::config::ClientConfig;
use crate::models::{OperationType, PendingOperation, Priority, TodoId, TodoItem};
use crate::projection::{TodoFilter, TodoView};
use crate::remote::TodoApi;
use crate::services::LocalStore;
use crate::state::SyncStatus;
use crate::{Error, Result};

use delivery::{Attempt, Delivery};

/// Default bound on concurrently running background deliveries.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Tuning knobs for [`SyncEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Background deliveries allowed to talk to the remote service at once.
    /// Further deliveries wait for a slot without blocking the caller.
    pub max_in_flight: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

impl From<&ClientConfig> for SyncOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_in_flight: config.max_in_flight(),
        }
    }
}

/// The operation a drain stopped at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainHalt {
    pub seq: i64,
    pub todo_id: TodoId,
    pub operation: OperationType,
    pub reason: String,
}

/// Outcome of [`SyncEngine::drain_pending_operations`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Operations confirmed and removed from the log
    pub delivered: usize,
    /// Operations still queued afterwards
    pub remaining: usize,
    /// Set when a remote failure stopped the drain
    pub halted: Option<DrainHalt>,
}

impl DrainReport {
    /// True when the whole log was delivered.
    pub const fn is_complete(&self) -> bool {
        self.halted.is_none()
    }
}

/// Step at which reconciliation gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStage {
    Drain,
    Pull,
}

/// Outcome of [`SyncEngine::reconcile_with_remote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileReport {
    /// Queue emptied and the local store replaced by the remote list
    Reconciled { delivered: usize, pulled: usize },
    /// A remote failure stopped reconciliation; the local store is untouched
    /// by the pull step
    Aborted {
        stage: ReconcileStage,
        delivered: usize,
        reason: String,
    },
}

struct Inner {
    delivery: Delivery,
    permits: Arc<Semaphore>,
    in_flight: Mutex<JoinSet<()>>,
    active: Arc<AtomicUsize>,
    /// Background deliveries hold it shared, a drain holds it exclusively.
    gate: Arc<RwLock<()>>,
}

/// Coordinates the local store, the pending-operation log, and the remote
/// service.
///
/// Cheap to clone; clones share background tasks and the syncing signal.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

impl SyncEngine {
    pub fn new(store: LocalStore, api: Arc<dyn TodoApi>, options: SyncOptions) -> Self {
        let (syncing, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                delivery: Delivery::new(store, api, syncing),
                permits: Arc::new(Semaphore::new(options.max_in_flight.max(1))),
                in_flight: Mutex::new(JoinSet::new()),
                active: Arc::new(AtomicUsize::new(0)),
                gate: Arc::new(RwLock::new(())),
            }),
        }
    }

    pub fn store(&self) -> &LocalStore {
        &self.inner.delivery.store
    }

    /// Create an item locally and start delivering it.
    ///
    /// Returns the locally stored item; its id may later be replaced by the
    /// one the remote service assigns.
    pub async fn add_item(&self, title: &str, priority: Priority) -> Result<TodoItem> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("Todo title cannot be empty".to_string()));
        }

        let item = TodoItem::new(title, priority);
        let operation = self.store().record_create(&item).await?;
        tracing::debug!("Queued create for todo {} (seq {})", item.id, operation.seq);
        self.dispatch(operation).await;
        Ok(item)
    }

    /// Overwrite an existing item and start delivering the change.
    pub async fn update_item(&self, item: TodoItem) -> Result<()> {
        let title = item.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("Todo title cannot be empty".to_string()));
        }
        let item = TodoItem {
            title: title.to_string(),
            ..item
        };

        let operation = self.store().record_update(&item).await?;
        tracing::debug!("Queued update for todo {} (seq {})", item.id, operation.seq);
        self.dispatch(operation).await;
        Ok(())
    }

    /// Remove an item and start delivering the delete.
    pub async fn delete_item(&self, id: &TodoId) -> Result<()> {
        let operation = self.store().record_delete(id).await?;
        tracing::debug!("Queued delete for todo {id} (seq {})", operation.seq);
        self.dispatch(operation).await;
        Ok(())
    }

    /// Flip the completion flag of an item.
    ///
    /// Returns `None` (and queues nothing) when the item is not in the store.
    pub async fn toggle_completed(&self, id: &TodoId) -> Result<Option<TodoItem>> {
        let Some(mut item) = self.store().get(id).await? else {
            tracing::debug!("Toggle ignored, todo {id} not found");
            return Ok(None);
        };
        item.is_completed = !item.is_completed;

        match self.update_item(item.clone()).await {
            Ok(()) => Ok(Some(item)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Replay the pending-operation log oldest first.
    ///
    /// Waits for background deliveries already sending, and holds later ones
    /// back until it finishes. Each operation is re-read from the log, so ids
    /// adopted from a CREATE earlier in the pass are used by the operations
    /// after it. Stops at the first remote failure so later operations never
    /// overtake an earlier one. Local storage errors are returned as `Err`.
    pub async fn drain_pending_operations(&self) -> Result<DrainReport> {
        let _drain = self.inner.gate.write().await;
        let delivery = &self.inner.delivery;

        tracing::info!(
            "Draining {} pending operation(s)",
            delivery.store.pending_count().await?
        );

        let mut report = DrainReport::default();
        let mut cursor = 0;
        while let Some(operation) = delivery.store.next_pending_after(cursor).await? {
            cursor = operation.seq;
            match delivery.replay(&operation).await? {
                Attempt::Confirmed => report.delivered += 1,
                Attempt::Settled => {}
                Attempt::Failed(error) => {
                    tracing::warn!(
                        "Drain halted at seq {} ({} {}): {error}",
                        operation.seq,
                        operation.operation_type(),
                        operation.todo_id
                    );
                    report.halted = Some(DrainHalt {
                        seq: operation.seq,
                        todo_id: operation.todo_id.clone(),
                        operation: operation.operation_type(),
                        reason: error.to_string(),
                    });
                    break;
                }
            }
        }

        report.remaining = delivery.store.pending_count().await?;
        tracing::info!(
            "Drain finished: {} delivered, {} remaining",
            report.delivered,
            report.remaining
        );
        Ok(report)
    }

    /// Drain the log, then replace the local store with the remote list.
    ///
    /// The pull only happens after a complete drain, so no queued local
    /// change is overwritten by stale remote state.
    pub async fn reconcile_with_remote(&self) -> Result<ReconcileReport> {
        let drain = self.drain_pending_operations().await?;
        if let Some(halt) = drain.halted {
            return Ok(ReconcileReport::Aborted {
                stage: ReconcileStage::Drain,
                delivered: drain.delivered,
                reason: halt.reason,
            });
        }

        let delivery = &self.inner.delivery;
        let _syncing = delivery.syncing_guard();
        let remote = match delivery.api.list_all().await {
            Ok(items) => items,
            Err(error) => {
                tracing::warn!("Reconcile aborted, remote list unavailable: {error}");
                return Ok(ReconcileReport::Aborted {
                    stage: ReconcileStage::Pull,
                    delivered: drain.delivered,
                    reason: error.to_string(),
                });
            }
        };

        delivery.store.replace_all(&remote).await?;
        tracing::info!("Reconciled local store with {} remote item(s)", remote.len());
        Ok(ReconcileReport::Reconciled {
            delivered: drain.delivered,
            pulled: remote.len(),
        })
    }

    /// Live view over the local store.
    pub fn view(&self, filter: TodoFilter) -> TodoView {
        TodoView::new(self.store().clone(), filter)
    }

    /// One-shot read of the items matching `filter`.
    pub async fn items(&self, filter: &TodoFilter) -> Result<Vec<TodoItem>> {
        filter.load(self.store()).await
    }

    pub async fn pending_operations(&self) -> Result<Vec<PendingOperation>> {
        self.store().pending_operations().await
    }

    /// Signal that is `true` while a remote call is outstanding.
    pub fn syncing(&self) -> watch::Receiver<bool> {
        self.inner.delivery.subscribe_syncing()
    }

    pub fn is_syncing(&self) -> bool {
        self.inner.delivery.is_syncing()
    }

    /// Background deliveries not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Snapshot of queue depth and activity.
    pub async fn status(&self) -> Result<SyncStatus> {
        Ok(SyncStatus {
            pending: self.store().pending_count().await?,
            in_flight: self.in_flight(),
            syncing: self.is_syncing(),
        })
    }

    /// Wait until every background delivery started so far has finished.
    pub async fn wait_idle(&self) {
        loop {
            let mut tasks = std::mem::take(&mut *self.inner.in_flight.lock().await);
            if tasks.is_empty() {
                return;
            }
            while let Some(joined) = tasks.join_next().await {
                if let Err(error) = joined {
                    if error.is_panic() {
                        tracing::error!("Background delivery panicked: {error}");
                    }
                }
            }
        }
    }

    /// Abort outstanding background deliveries.
    ///
    /// Their operations stay queued and are picked up by the next drain.
    pub async fn shutdown(&self) {
        let mut tasks = std::mem::take(&mut *self.inner.in_flight.lock().await);
        if !tasks.is_empty() {
            tracing::info!("Aborting {} background deliveries", tasks.len());
        }
        tasks.shutdown().await;
    }

    async fn dispatch(&self, operation: PendingOperation) {
        let delivery = self.inner.delivery.clone();
        let permits = Arc::clone(&self.inner.permits);
        let gate = Arc::clone(&self.inner.gate);
        let active = ActiveGuard::enter(&self.inner.active);

        let mut tasks = self.inner.in_flight.lock().await;
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            let _active = active;
            let _shared = gate.read().await;
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            match delivery.replay_queued(operation.seq).await {
                Ok(Attempt::Confirmed) => {}
                Ok(Attempt::Settled) => tracing::debug!(
                    "Seq {} already delivered by a drain, skipped",
                    operation.seq
                ),
                Ok(Attempt::Failed(error)) => tracing::warn!(
                    "Delivery of {} for todo {} failed, left queued (seq {}): {error}",
                    operation.operation_type(),
                    operation.todo_id,
                    operation.seq
                ),
                Err(error) => tracing::error!(
                    "Failed to record delivery of seq {}: {error}",
                    operation.seq
                ),
            }
        });
    }
}

/// Counts a background delivery until dropped, including on abort.
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
