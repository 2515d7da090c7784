use todo_core::{Priority, SyncEngine, TodoItem};

use crate::commands::common::resolve_todo;
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    title: Option<&str>,
    priority: Option<Priority>,
    engine: &SyncEngine,
) -> Result<(), CliError> {
    let item = resolve_todo(id, engine.store()).await?;
    let edited = apply_edit(item, title, priority)?;

    engine.update_item(edited.clone()).await?;
    println!("{}", edited.id);
    Ok(())
}

/// Apply the requested changes; at least one must be given.
pub fn apply_edit(
    item: TodoItem,
    title: Option<&str>,
    priority: Option<Priority>,
) -> Result<TodoItem, CliError> {
    if title.is_none() && priority.is_none() {
        return Err(CliError::NothingToEdit);
    }

    let title = match title.map(str::trim) {
        Some("") => return Err(CliError::EmptyTitle),
        Some(title) => title.to_string(),
        None => item.title.clone(),
    };
    Ok(TodoItem {
        title,
        priority: priority.unwrap_or(item.priority),
        ..item
    })
}
