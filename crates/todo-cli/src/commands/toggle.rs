use todo_core::SyncEngine;

use crate::commands::common::resolve_todo;
use crate::error::CliError;

pub async fn run_toggle(id: &str, engine: &SyncEngine) -> Result<(), CliError> {
    let item = resolve_todo(id, engine.store()).await?;

    match engine.toggle_completed(&item.id).await? {
        Some(toggled) if toggled.is_completed => println!("{} completed", toggled.id),
        Some(toggled) => println!("{} reopened", toggled.id),
        None => return Err(CliError::TodoNotFound(item.id.to_string())),
    }
    Ok(())
}
