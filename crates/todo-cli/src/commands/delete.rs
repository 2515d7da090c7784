use todo_core::SyncEngine;

use crate::commands::common::resolve_todo;
use crate::error::CliError;

pub async fn run_delete(id: &str, engine: &SyncEngine) -> Result<(), CliError> {
    let item = resolve_todo(id, engine.store()).await?;

    engine.delete_item(&item.id).await?;
    println!("{}", item.id);
    Ok(())
}
