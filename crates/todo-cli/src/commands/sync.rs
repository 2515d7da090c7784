use todo_core::{ClientConfig, ReconcileReport, ReconcileStage, SyncEngine};

use crate::commands::common::{format_pending_lines, pending_to_item, PendingItem};
use crate::error::CliError;

pub async fn run_sync(engine: &SyncEngine) -> Result<(), CliError> {
    let report = engine.reconcile_with_remote().await?;
    println!("{}", describe_reconcile(&report));
    Ok(())
}

pub async fn run_push(engine: &SyncEngine) -> Result<(), CliError> {
    let report = engine.drain_pending_operations().await?;
    match report.halted {
        None => println!("Delivered {} change(s); queue is empty", report.delivered),
        Some(halt) => println!(
            "Delivered {} change(s); {} still queued (stopped at #{} {} {}: {})",
            report.delivered,
            report.remaining,
            halt.seq,
            halt.operation,
            halt.todo_id,
            halt.reason
        ),
    }
    Ok(())
}

pub async fn run_pending(as_json: bool, engine: &SyncEngine) -> Result<(), CliError> {
    let operations = engine.pending_operations().await?;

    if as_json {
        let json_items = operations
            .iter()
            .map(pending_to_item)
            .collect::<Vec<PendingItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if operations.is_empty() {
        println!("No pending changes.");
        return Ok(());
    }

    for line in format_pending_lines(&operations) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_status(engine: &SyncEngine, config: &ClientConfig) -> Result<(), CliError> {
    let status = engine.status().await?;
    let endpoint = config
        .api_base_url()
        .unwrap_or_else(|| "(none, offline only)".to_string());

    println!("Endpoint: {endpoint}");
    println!("Items:    {}", engine.store().count().await?);
    println!("Pending:  {}", status.pending);
    Ok(())
}

pub fn describe_reconcile(report: &ReconcileReport) -> String {
    match report {
        ReconcileReport::Reconciled { delivered, pulled } => {
            format!("Sync completed: delivered {delivered} change(s), pulled {pulled} item(s)")
        }
        ReconcileReport::Aborted {
            stage: ReconcileStage::Drain,
            delivered,
            reason,
        } => format!(
            "Sync incomplete: delivered {delivered} change(s), the rest stay queued ({reason})"
        ),
        ReconcileReport::Aborted {
            stage: ReconcileStage::Pull,
            reason,
            ..
        } => format!("Sync incomplete: could not fetch the server list ({reason})"),
    }
}
