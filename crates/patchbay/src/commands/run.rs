//! `patchbay run`: the long-running daemon.
//!
//! Restores the saved layout, keeps autosave running, logs every routing
//! event, and writes a final layout on Ctrl-C.

use tracing::{info, warn};

use patchbay_core::{Delivery, Engine, EngineConfig, RoutingEvent};

use crate::cli::{GlobalOpts, RunArgs};
use crate::error::CliError;
use crate::output;

/// Fold `run` flags into the engine config before the engine is built.
pub fn apply_overrides(args: &RunArgs, config: &mut EngineConfig) {
    if let Some(interval) = args.autosave {
        config.layout.autosave_interval = interval;
    }
    if args.no_restore {
        config.layout.restore_on_startup = false;
    }
}

fn log_event(event: &RoutingEvent) {
    match event {
        RoutingEvent::ConnectionChanged(change) => match &change.connection {
            Some(key) => info!(action = %change.action, connection = %key, "connection changed"),
            None => info!(
                action = %change.action,
                detail = change.detail.as_deref().unwrap_or_default(),
                "connections changed"
            ),
        },
        RoutingEvent::StatusChanged(health) if health.running => {
            info!("routing daemon is up");
        }
        RoutingEvent::StatusChanged(_) => warn!("routing daemon is down"),
    }
}

pub async fn handle(engine: &Engine, _args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut events = engine.subscribe();

    match engine.start().await {
        Some(report) => {
            output::print_output(
                &format!(
                    "Restored {} connections ({} failed) from {}",
                    report.restored,
                    report.failed,
                    engine.layout().path().display()
                ),
                global.quiet,
            );
        }
        // Nothing restored: adopt whatever the daemon already has so the
        // first autosave is not empty.
        None => {
            if let Err(e) = engine.reconciler().current_connections().await {
                warn!(error = %e, "initial sync failed");
            }
        }
    }

    let autosave = engine.config().layout.autosave_interval;
    info!(
        bridge = %engine.control_plane().config().url,
        layout = %engine.layout().path().display(),
        autosave = %humantime::format_duration(autosave),
        "patchbay running, Ctrl-C to stop"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!(error = %e, "signal handler failed");
                }
                break;
            }

            delivery = events.recv() => match delivery {
                Some(Delivery::Event(event)) => log_event(&event),
                Some(Delivery::Missed(n)) => warn!(missed = n, "event log fell behind"),
                None => break,
            },
        }
    }

    info!("shutting down");
    events.unsubscribe();
    engine.shutdown().await?;
    Ok(())
}
