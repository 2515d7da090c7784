//! Replay of a single pending operation against the remote service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::models::{OperationPayload, PendingOperation};
use crate::remote::{RemoteError, TodoApi};
use crate::services::LocalStore;
use crate::Result;

/// Result of one delivery attempt that did not hit a local storage error.
#[derive(Debug)]
pub(super) enum Attempt {
    Confirmed,
    /// The operation left the log before it was sent; nothing went out.
    Settled,
    Failed(RemoteError),
}

/// Everything a delivery needs, cloneable into background tasks.
#[derive(Clone)]
pub(super) struct Delivery {
    pub(super) store: LocalStore,
    pub(super) api: Arc<dyn TodoApi>,
    syncing: Arc<watch::Sender<bool>>,
    outstanding: Arc<AtomicUsize>,
}

impl Delivery {
    pub(super) fn new(
        store: LocalStore,
        api: Arc<dyn TodoApi>,
        syncing: watch::Sender<bool>,
    ) -> Self {
        Self {
            store,
            api,
            syncing: Arc::new(syncing),
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(super) fn subscribe_syncing(&self) -> watch::Receiver<bool> {
        self.syncing.subscribe()
    }

    pub(super) fn is_syncing(&self) -> bool {
        *self.syncing.borrow()
    }

    /// Marks a remote call as outstanding until the guard is dropped.
    pub(super) fn syncing_guard(&self) -> SyncingGuard {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        publish_syncing(&self.syncing, &self.outstanding);
        SyncingGuard {
            syncing: Arc::clone(&self.syncing),
            outstanding: Arc::clone(&self.outstanding),
        }
    }

    /// Deliver the operation queued under `seq`, read fresh from the log.
    ///
    /// An operation a drain already confirmed is not sent again, and one
    /// retargeted by an earlier CREATE goes to the adopted id.
    pub(super) async fn replay_queued(&self, seq: i64) -> Result<Attempt> {
        match self.store.pending_operation(seq).await? {
            Some(operation) => self.replay(&operation).await,
            None => Ok(Attempt::Settled),
        }
    }

    /// Send one operation and, on success, remove it from the log.
    ///
    /// A successful CREATE adopts the item the service returned. A DELETE the
    /// service answers with 404 counts as delivered, since the item is gone
    /// either way.
    pub(super) async fn replay(&self, operation: &PendingOperation) -> Result<Attempt> {
        let sent = {
            let _syncing = self.syncing_guard();
            match &operation.payload {
                OperationPayload::Create(item) => self.api.create(item).await.map(Some),
                OperationPayload::Update(item) => self
                    .api
                    .update(&operation.todo_id, item)
                    .await
                    .map(|_| None),
                OperationPayload::Delete => match self.api.delete(&operation.todo_id).await {
                    Err(error) if error.is_not_found() => {
                        tracing::debug!(
                            "Todo {} already absent remotely, delete confirmed",
                            operation.todo_id
                        );
                        Ok(None)
                    }
                    other => other.map(|()| None),
                },
            }
        };

        match sent {
            Ok(Some(remote)) => {
                self.store
                    .adopt_created(operation.seq, &operation.todo_id, &remote)
                    .await?;
                if remote.id != operation.todo_id {
                    tracing::debug!("Todo {} adopted remote id {}", operation.todo_id, remote.id);
                }
            }
            Ok(None) => {
                self.store.confirm(operation.seq).await?;
            }
            Err(error) => return Ok(Attempt::Failed(error)),
        }
        Ok(Attempt::Confirmed)
    }
}

pub(super) struct SyncingGuard {
    syncing: Arc<watch::Sender<bool>>,
    outstanding: Arc<AtomicUsize>,
}

impl Drop for SyncingGuard {
    fn drop(&mut self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        publish_syncing(&self.syncing, &self.outstanding);
    }
}

/// Re-derive the flag from the counter under the channel's lock, so racing
/// guards settle on the final count.
fn publish_syncing(syncing: &watch::Sender<bool>, outstanding: &AtomicUsize) {
    syncing.send_if_modified(|flag| {
        let busy = outstanding.load(Ordering::SeqCst) > 0;
        let changed = *flag != busy;
        *flag = busy;
        changed
    });
}
