use todo_core::{Priority, SyncEngine, TodoFilter, TodoItem};

use crate::commands::common::{format_todo_lines, todo_to_list_item, TodoListItem};
use crate::error::CliError;

pub async fn run_list(
    selector: Option<Priority>,
    query: Option<&str>,
    as_json: bool,
    engine: &SyncEngine,
) -> Result<(), CliError> {
    let items = list_items(selector, query, engine).await?;

    if as_json {
        let json_items = items
            .iter()
            .map(todo_to_list_item)
            .collect::<Vec<TodoListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if items.is_empty() {
        println!("No items.");
    } else {
        for line in format_todo_lines(&items) {
            println!("{line}");
        }
    }

    Ok(())
}

/// Items for one selector, or every item when no selector is given.
pub async fn list_items(
    selector: Option<Priority>,
    query: Option<&str>,
    engine: &SyncEngine,
) -> Result<Vec<TodoItem>, CliError> {
    let query = query.unwrap_or_default();
    match selector {
        Some(priority) => Ok(engine
            .items(&TodoFilter::new(priority).with_query(query))
            .await?),
        None => {
            let filter = TodoFilter::default().with_query(query);
            Ok(engine
                .store()
                .list_all()
                .await?
                .into_iter()
                .filter(|item| filter.matches_query(item))
                .collect())
        }
    }
}
