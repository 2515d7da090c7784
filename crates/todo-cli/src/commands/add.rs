use todo_core::{Priority, SyncEngine};

use crate::commands::common::normalize_title;
use crate::error::CliError;

pub async fn run_add(
    title_parts: &[String],
    priority: Priority,
    engine: &SyncEngine,
) -> Result<(), CliError> {
    let title = normalize_title(title_parts)?;
    let item = engine.add_item(&title, priority).await?;

    println!("{}", item.id);
    Ok(())
}
