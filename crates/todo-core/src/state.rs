//! Shared sync state types.

/// Queue depth and delivery activity at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// Operations waiting in the pending-operation log
    pub pending: usize,
    /// Background deliveries not yet finished
    pub in_flight: usize,
    /// A remote call is outstanding
    pub syncing: bool,
}

impl SyncStatus {
    /// Nothing queued and nothing running.
    pub const fn is_settled(&self) -> bool {
        self.pending == 0 && self.in_flight == 0 && !self.syncing
    }
}
