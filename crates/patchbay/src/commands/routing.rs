//! Status, listing and single-pair routing handlers.

use serde::Serialize;
use tabled::Tabled;

use patchbay_core::{
    BridgeHealth, BridgeStatus, Capabilities, Capability, Connection, ConnectionKey, Engine,
    ItemOutcome, Port,
};

use crate::cli::{BulkAction, BulkArgs, ConnectionsArgs, GlobalOpts, PairArgs, PortsArgs};
use crate::error::CliError;
use crate::output::{self, Tone};

use super::util;

// ── Status ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct StatusView {
    bridge: String,
    health: BridgeHealth,
    status: BridgeStatus,
    capabilities: Capabilities,
}

fn capability_word(cap: Capability, color: bool) -> String {
    let tone = match cap {
        Capability::Supported => Tone::Good,
        Capability::Unsupported => Tone::Warn,
        Capability::Unknown => Tone::Muted,
    };
    output::paint(&cap.to_string(), tone, color)
}

fn status_detail(view: &StatusView, color: bool) -> String {
    let jack = if view.status.running {
        output::paint("running", Tone::Good, color)
    } else {
        output::paint("stopped", Tone::Bad, color)
    };
    let mut lines = vec![
        format!("Bridge:            {}", view.bridge),
        format!("JACK:              {jack}"),
    ];
    if let Some(rate) = view.status.sample_rate {
        lines.push(format!("Sample rate:       {rate} Hz"));
    }
    if let Some(size) = view.status.buffer_size {
        lines.push(format!("Buffer size:       {size}"));
    }
    if let Some(name) = &view.status.client_name {
        lines.push(format!("Client:            {name}"));
    }
    lines.push(format!(
        "Health cache:      {}",
        humantime::format_duration(view.health.cache_ttl)
    ));
    lines.push(format!(
        "Native disconnect: {}",
        capability_word(view.capabilities.native_disconnect, color)
    ));
    lines.push(format!(
        "Native clear:      {}",
        capability_word(view.capabilities.native_clear, color)
    ));
    lines.join("\n")
}

pub async fn status(engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    let control = engine.control_plane();
    let status = control.status().await?;
    let view = StatusView {
        bridge: control.config().url.to_string(),
        health: control.health(),
        status,
        capabilities: control.capabilities(),
    };

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| status_detail(v, color),
        |v| if v.status.running { "running" } else { "stopped" }.to_owned(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Ports ───────────────────────────────────────────────────────────

#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "Direction")]
    direction: String,
    #[tabled(rename = "Type")]
    kind: String,
}

impl From<&Port> for PortRow {
    fn from(p: &Port) -> Self {
        Self {
            name: p.name.clone(),
            client: p.client.clone(),
            direction: p.direction.to_string(),
            kind: p.kind.to_string(),
        }
    }
}

pub async fn ports(engine: &Engine, args: PortsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut ports = engine.reconciler().ports().await?;
    if let Some(filter) = &args.filter {
        ports.retain(|p| p.name.contains(filter.as_str()));
    }
    let out = output::render_list(&global.output, &ports, |p| PortRow::from(p), |p| p.name.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Connections ─────────────────────────────────────────────────────

#[derive(Tabled)]
struct ConnectionRow {
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
    #[tabled(rename = "Since")]
    since: String,
}

impl From<&Connection> for ConnectionRow {
    fn from(c: &Connection) -> Self {
        Self {
            from: c.from.clone(),
            to: c.to.clone(),
            since: c.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

pub async fn connections(
    engine: &Engine,
    args: ConnectionsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let connections = if args.tracked {
        engine.reconciler().tracked().to_vec()
    } else {
        engine.reconciler().current_connections().await?
    };
    let out = output::render_list(&global.output, &connections, |c| ConnectionRow::from(c), |c| {
        c.key().to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Mutations ───────────────────────────────────────────────────────

pub async fn connect(engine: &Engine, args: PairArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let result = engine.reconciler().connect(&args.from, &args.to).await?;
    let outcome = ItemOutcome::Connected {
        already_connected: result.already_connected,
    };

    let color = output::should_color(&global.color);
    let key = ConnectionKey::new(&*args.from, &*args.to);
    let out = output::render_single(
        &global.output,
        &result,
        |_| format!("{key}: {}", util::describe(&outcome, color)),
        |_| key.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn disconnect(
    engine: &Engine,
    args: PairArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let result = engine.reconciler().disconnect(&args.from, &args.to).await?;

    let color = output::should_color(&global.color);
    let key = ConnectionKey::new(&*args.from, &*args.to);
    let outcome = ItemOutcome::Disconnected(result.clone());
    let out = output::render_single(
        &global.output,
        &result,
        |r| {
            let mut lines = vec![format!("{key}: {}", util::describe(&outcome, color))];
            if r.rebuilt_connections > 0 {
                lines.push(format!("Rebuilt {} other connections", r.rebuilt_connections));
            }
            for lost in &r.failed_rebuilds {
                lines.push(format!(
                    "  {} -> {}: {}",
                    lost.from,
                    lost.to,
                    output::paint(&lost.error, Tone::Bad, color)
                ));
            }
            lines.join("\n")
        },
        |_| key.to_string(),
    )?;
    output::print_output(&out, global.quiet);

    let lost = result.failed_rebuilds.len();
    util::partial_failure("disconnect rebuild", lost, lost + result.rebuilt_connections)
}

pub async fn bulk(engine: &Engine, args: BulkArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let pairs: Vec<ConnectionKey> = args
        .pairs
        .into_iter()
        .map(|(from, to)| ConnectionKey::new(from, to))
        .collect();

    let (operation, result) = match args.action {
        BulkAction::Connect => ("bulk connect", engine.reconciler().bulk_connect(&pairs).await),
        BulkAction::Disconnect => (
            "bulk disconnect",
            engine.reconciler().bulk_disconnect(&pairs).await,
        ),
    };
    util::finish_bulk(operation, &result, global)
}

#[derive(Serialize)]
struct ClearView {
    cleared: u32,
}

pub async fn clear(engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    let view = ClearView {
        cleared: engine.reconciler().clear_all().await?,
    };
    let out = output::render_single(
        &global.output,
        &view,
        |v| format!("Cleared {} connections", v.cleared),
        |v| v.cleared.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
