//! todo CLI - Offline-first to-do list
//!
//! Every change is saved locally first and delivered to the server in the
//! background; anything the server has not confirmed stays queued.

mod cli;
mod commands;
mod config_file;
mod error;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::{open_engine, resolve_db_path};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::sync::{run_pending, run_push, run_status, run_sync};
use crate::commands::toggle::run_toggle;
use crate::config_file::{config_path, load_effective_config};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "todo=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config_path = config_path()?;
    match command {
        Commands::Config { command } => return run_config(command, &config_path),
        Commands::Completions { shell, output } => {
            return run_completions(shell, output.as_deref());
        }
        _ => {}
    }

    let config = load_effective_config(&config_path)?;
    let db_path = resolve_db_path(cli.db_path)?;
    let engine = open_engine(&db_path, &config).await?;

    let outcome = match command {
        Commands::Add { title, priority } => run_add(&title, priority.into(), &engine).await,
        Commands::List {
            priority,
            query,
            json,
        } => run_list(priority.map(Into::into), query.as_deref(), json, &engine).await,
        Commands::Edit {
            id,
            title,
            priority,
        } => run_edit(&id, title.as_deref(), priority.map(Into::into), &engine).await,
        Commands::Toggle { id } => run_toggle(&id, &engine).await,
        Commands::Delete { id } => run_delete(&id, &engine).await,
        Commands::Sync => run_sync(&engine).await,
        Commands::Push => run_push(&engine).await,
        Commands::Pending { json } => run_pending(json, &engine).await,
        Commands::Status => run_status(&engine, &config).await,
        Commands::Config { .. } | Commands::Completions { .. } => Ok(()),
    };

    // Let background deliveries finish; whatever fails stays queued.
    engine.wait_idle().await;
    outcome
}
