//! todo-core - Core library for todo-sync
//!
//! Local store, pending-operation log, remote clients, and the sync engine
//! that keeps a to-do list usable offline and eventually consistent with a
//! remote service.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod projection;
pub mod remote;
pub mod services;
pub mod state;
pub mod sync;
pub mod util;

pub use config::ClientConfig;
pub use error::{Error, Result};
pub use models::{OperationPayload, OperationType, PendingOperation, Priority, TodoId, TodoItem};
pub use projection::{TodoFilter, TodoView};
pub use remote::{HttpTodoApi, InMemoryTodoApi, OfflineTodoApi, RemoteError, TodoApi};
pub use services::LocalStore;
pub use state::SyncStatus;
pub use sync::{DrainHalt, DrainReport, ReconcileReport, ReconcileStage, SyncEngine, SyncOptions};
