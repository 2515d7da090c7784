use std::env;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use todo_core::models::format_wire_timestamp;
use todo_core::{
    ClientConfig, LocalStore, OperationPayload, PendingOperation, SyncEngine, SyncOptions, TodoId,
    TodoItem,
};

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct TodoListItem {
    pub id: String,
    pub title: String,
    pub priority: String,
    pub completed: bool,
    pub created_at: String,
    pub relative_time: String,
}

#[derive(Debug, Serialize)]
pub struct PendingItem {
    pub seq: i64,
    pub operation: String,
    pub todo_id: String,
    pub title: Option<String>,
    pub recorded_at: String,
}

/// Open the local store and wire the sync engine to the configured endpoint.
///
/// With `sync_on_start` and an endpoint configured, queued changes are
/// drained before the command runs.
pub async fn open_engine(db_path: &Path, config: &ClientConfig) -> Result<SyncEngine, CliError> {
    let store = LocalStore::open_path(db_path).await?;
    let api = config.remote_api()?;
    let engine = SyncEngine::new(store, api, SyncOptions::from(config));

    if config.sync_on_start && config.api_base_url().is_some() {
        let report = engine.drain_pending_operations().await?;
        if let Some(halt) = report.halted {
            tracing::warn!(
                "Start-up drain stopped with {} change(s) queued: {}",
                report.remaining,
                halt.reason
            );
        }
    }

    Ok(engine)
}

/// Resolve an exact ID or unique ID prefix to a stored item.
pub async fn resolve_todo(query: &str, store: &LocalStore) -> Result<TodoItem, CliError> {
    let query = normalize_todo_identifier(query)?;
    if let Some(item) = store.get(&TodoId::new(query.as_str())).await? {
        return Ok(item);
    }

    let matching_ids = store.list_ids_by_prefix(&query, 3).await?;
    match matching_ids.as_slice() {
        [] => Err(CliError::TodoNotFound(query)),
        [id] => store
            .get(id)
            .await?
            .ok_or_else(|| CliError::TodoNotFound(query.clone())),
        ids => {
            let options = ids
                .iter()
                .map(short_id)
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousTodoId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn normalize_todo_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyTodoId)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_title(parts: &[String]) -> Result<String, CliError> {
    let collapsed = parts
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if collapsed.is_empty() {
        Err(CliError::EmptyTitle)
    } else {
        Ok(collapsed)
    }
}

/// Display prefix of an id.
///
/// Long enough to reach past the millisecond timestamp of a UUID v7 into its
/// random bits, so items created in the same millisecond still differ.
pub fn short_id(id: &TodoId) -> String {
    id.as_str().chars().take(SHORT_ID_LEN).collect()
}

const SHORT_ID_LEN: usize = 18;

pub fn format_todo_lines(items: &[TodoItem]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    items
        .iter()
        .map(|item| {
            let check = if item.is_completed { "[x]" } else { "[ ]" };
            let relative_time = format_relative_time(item.created_at_millis(), now_ms);
            format!(
                "{:<18}  {check} {:<6}  {:<40}  {relative_time}",
                short_id(&item.id),
                item.priority.as_str(),
                truncate(&item.title, 40)
            )
        })
        .collect()
}

pub fn todo_to_list_item(item: &TodoItem) -> TodoListItem {
    let now_ms = Utc::now().timestamp_millis();
    TodoListItem {
        id: item.id.to_string(),
        title: item.title.clone(),
        priority: item.priority.as_str().to_string(),
        completed: item.is_completed,
        created_at: format_wire_timestamp(&item.created_at),
        relative_time: format_relative_time(item.created_at_millis(), now_ms),
    }
}

pub fn pending_to_item(operation: &PendingOperation) -> PendingItem {
    PendingItem {
        seq: operation.seq,
        operation: operation.operation_type().to_string(),
        todo_id: operation.todo_id.to_string(),
        title: operation.payload.snapshot().map(|item| item.title.clone()),
        recorded_at: format_timestamp(operation.created_at),
    }
}

pub fn format_pending_lines(operations: &[PendingOperation]) -> Vec<String> {
    operations
        .iter()
        .map(|operation| {
            let detail = match &operation.payload {
                OperationPayload::Create(item) | OperationPayload::Update(item) => {
                    truncate(&item.title, 40)
                }
                OperationPayload::Delete => String::new(),
            };
            format!(
                "#{:<5} {:<6}  {:<18}  {}  {detail}",
                operation.seq,
                operation.operation_type().as_str(),
                short_id(&operation.todo_id),
                format_timestamp(operation.created_at)
            )
            .trim_end()
            .to_string()
        })
        .collect()
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut truncated = text
            .chars()
            .take(max_chars.saturating_sub(3))
            .collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os("TODO_DB_PATH").map(PathBuf::from)) {
        return Ok(path);
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("todo").join("todo.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}
