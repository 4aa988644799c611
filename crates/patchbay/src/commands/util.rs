//! Shared helpers for command handlers.

use tabled::Tabled;

use patchbay_core::{BulkResult, ItemOutcome};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, Tone};

// ── Per-item rows ───────────────────────────────────────────────────

#[derive(Tabled)]
pub struct ItemRow {
    #[tabled(rename = "From")]
    pub from: String,
    #[tabled(rename = "To")]
    pub to: String,
    #[tabled(rename = "Result")]
    pub result: String,
}

/// One-line summary of an item outcome.
pub fn describe(outcome: &ItemOutcome, color: bool) -> String {
    match outcome {
        ItemOutcome::Connected {
            already_connected: false,
        } => output::paint("connected", Tone::Good, color),
        ItemOutcome::Connected {
            already_connected: true,
        } => output::paint("already connected", Tone::Muted, color),
        ItemOutcome::Disconnected(d) if !d.was_connected => {
            output::paint("not connected", Tone::Muted, color)
        }
        ItemOutcome::Disconnected(d) if d.failed_rebuilds.is_empty() => {
            output::paint(&format!("disconnected ({})", d.method), Tone::Good, color)
        }
        ItemOutcome::Disconnected(d) => output::paint(
            &format!(
                "disconnected ({}), {} lost in rebuild",
                d.method,
                d.failed_rebuilds.len()
            ),
            Tone::Warn,
            color,
        ),
        ItemOutcome::Validated => output::paint("validated", Tone::Good, color),
        ItemOutcome::Failed { error } => output::paint(&format!("failed: {error}"), Tone::Bad, color),
    }
}

/// Print a bulk result and turn any failed item into a non-zero exit.
pub fn finish_bulk(operation: &str, result: &BulkResult, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        result,
        |r| bulk_table(r, color),
        |r| format!("{}/{}", r.successful, r.total),
    )?;
    output::print_output(&out, global.quiet);
    partial_failure(operation, result.failed, result.total)
}

pub fn bulk_table(result: &BulkResult, color: bool) -> String {
    let rows: Vec<ItemRow> = result
        .items
        .iter()
        .map(|item| ItemRow {
            from: item.from.clone(),
            to: item.to.clone(),
            result: describe(&item.outcome, color),
        })
        .collect();
    format!(
        "{}\n{} of {} succeeded",
        output::render_table(&rows),
        result.successful,
        result.total
    )
}

pub fn partial_failure(operation: &str, failed: usize, total: usize) -> Result<(), CliError> {
    if failed == 0 {
        return Ok(());
    }
    Err(CliError::PartialFailure {
        operation: operation.to_owned(),
        failed,
        total,
    })
}
