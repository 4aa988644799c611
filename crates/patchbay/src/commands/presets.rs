//! Preset command handlers.

use tabled::Tabled;

use patchbay_core::{ApplyOptions, Engine, PresetApplyReport, PresetSummary, ValidationReport};

use crate::cli::{GlobalOpts, PresetsArgs, PresetsCommand};
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct PresetRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Connections")]
    connections: usize,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&PresetSummary> for PresetRow {
    fn from(p: &PresetSummary) -> Self {
        Self {
            name: p.name.clone(),
            connections: p.connections,
            description: p.description.clone(),
        }
    }
}

#[derive(Tabled)]
struct AliasRow {
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Resolves to")]
    resolved: String,
}

fn validation_detail(report: &ValidationReport, color: bool) -> String {
    let mut rows: Vec<AliasRow> = report
        .valid
        .iter()
        .map(|c| AliasRow {
            from: c.from_alias.clone(),
            to: c.to_alias.clone(),
            resolved: format!("{} -> {}", c.from, c.to),
        })
        .collect();
    rows.extend(report.invalid.iter().map(|c| AliasRow {
        from: c.from_alias.clone(),
        to: c.to_alias.clone(),
        resolved: output::paint(
            &format!("unknown alias: {}", c.missing.join(", ")),
            Tone::Bad,
            color,
        ),
    }));

    let verdict = if report.is_valid() {
        output::paint("valid", Tone::Good, color)
    } else {
        output::paint("invalid", Tone::Bad, color)
    };
    format!(
        "Preset '{}' is {verdict}\n{}",
        report.preset,
        output::render_table(&rows)
    )
}

fn apply_detail(report: &PresetApplyReport, color: bool) -> String {
    let rows: Vec<util::ItemRow> = report
        .items
        .iter()
        .map(|item| util::ItemRow {
            from: item.from.clone().unwrap_or_else(|| item.from_alias.clone()),
            to: item.to.clone().unwrap_or_else(|| item.to_alias.clone()),
            result: util::describe(&item.outcome, color),
        })
        .collect();

    let mode = if report.dry_run { " (dry run)" } else { "" };
    let mut lines = vec![format!("Preset '{}'{mode}", report.preset)];
    if !report.description.is_empty() {
        lines.push(report.description.clone());
    }
    lines.push(output::render_table(&rows));
    lines.push(format!(
        "{} of {} succeeded{}",
        report.successful,
        report.total,
        if report.cleared_first {
            ", existing connections cleared first"
        } else {
            ""
        }
    ));
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(engine: &Engine, args: PresetsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        PresetsCommand::List => {
            let presets = engine.presets().list();
            let out = output::render_list(&global.output, &presets, |p| PresetRow::from(p), |p| {
                p.name.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PresetsCommand::Validate { name } => {
            let report = engine.presets().validate(&name)?;
            let out = output::render_single(
                &global.output,
                &report,
                |r| validation_detail(r, color),
                |r| r.is_valid().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            util::partial_failure(
                "preset validation",
                report.invalid.len(),
                report.valid.len() + report.invalid.len(),
            )
        }

        PresetsCommand::Apply {
            name,
            dry_run,
            no_clear,
        } => {
            let options = ApplyOptions {
                clear_first: !no_clear,
                dry_run,
            };
            let report = engine.presets().apply(&name, options).await?;
            let out = output::render_single(
                &global.output,
                &report,
                |r| apply_detail(r, color),
                |r| format!("{}/{}", r.successful, r.total),
            )?;
            output::print_output(&out, global.quiet);
            util::partial_failure("preset apply", report.failed, report.total)
        }
    }
}
