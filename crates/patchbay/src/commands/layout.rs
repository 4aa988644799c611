//! Layout save / restore / show handlers.

use serde::Serialize;
use tabled::Tabled;

use patchbay_core::{Engine, LayoutSnapshot};

use crate::cli::{GlobalOpts, LayoutArgs, LayoutCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct SaveView {
    saved: bool,
    path: String,
    connections: usize,
}

#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
}

fn snapshot_detail(snapshot: &LayoutSnapshot) -> String {
    let rows: Vec<SnapshotRow> = snapshot
        .restore_pairs()
        .into_iter()
        .map(|k| SnapshotRow { from: k.from, to: k.to })
        .collect();
    format!(
        "Saved {}\n{}",
        snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        output::render_table(&rows)
    )
}

pub async fn handle(engine: &Engine, args: LayoutArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let store = engine.layout();

    match args.command {
        LayoutCommand::Save => {
            // A fresh process tracks nothing until it reads the daemon
            let connections = engine.reconciler().current_connections().await?;
            let saved = store.save().await?;
            if !saved {
                return Err(CliError::Unavailable {
                    url: String::new(),
                    reason: "daemon unhealthy, layout not written".into(),
                });
            }
            let view = SaveView {
                saved,
                path: store.path().display().to_string(),
                connections: connections.len(),
            };
            let out = output::render_single(
                &global.output,
                &view,
                |v| format!("Saved {} connections to {}", v.connections, v.path),
                |v| v.path.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LayoutCommand::Restore => {
            let report = store.restore().await?;
            let color = output::should_color(&global.color);
            let out = output::render_single(
                &global.output,
                &report,
                |r| {
                    format!(
                        "Restored layout from {}\n{}",
                        r.snapshot_timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                        util::bulk_table(&r.result, color)
                    )
                },
                |r| format!("{}/{}", r.restored, r.restored + r.failed),
            )?;
            output::print_output(&out, global.quiet);
            util::partial_failure("restore", report.failed, report.restored + report.failed)
        }

        LayoutCommand::Show => {
            let snapshot = store.load().await?;
            let out = output::render_single(&global.output, &snapshot, snapshot_detail, |s| {
                s.restore_pairs()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
