//! `patchbay`: operator CLI and daemon for the JACK routing engine.
//!
//! One-shot commands build an [`Engine`], run one operation and exit.
//! `patchbay run` restores the saved layout, autosaves, logs routing events
//! and saves once more on Ctrl-C.

mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::ffi::OsStr;
use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use patchbay_core::Engine;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Console logging on stderr, plus a non-blocking file writer when
/// `log_file` is set. The returned guard flushes the file on drop.
fn init_tracing(verbosity: u8, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let name = path.file_name().unwrap_or(OsStr::new("patchbay.log"));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    guard
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli { global, command } = cli;

    match command {
        // Config commands must work even when the file is invalid
        Command::Config(args) => {
            let _guard = init_tracing(global.verbose, None);
            commands::config_cmd::handle(args, &global)
        }

        cmd => {
            let config = config::load(&global)?;

            // The daemon logs at info by default and may also log to a file
            let (verbosity, log_file) = match &cmd {
                Command::Run(args) => (
                    global.verbose.saturating_add(1),
                    args.log_file.clone().or_else(|| config.logging.file.clone()),
                ),
                _ => (global.verbose, None),
            };
            let _guard = init_tracing(verbosity, log_file.as_deref());

            let mut engine_config = config.to_engine_config()?;
            if let Command::Run(args) = &cmd {
                commands::run::apply_overrides(args, &mut engine_config);
            }
            let bridge = engine_config.control_plane.url.to_string();
            let engine = Engine::new(engine_config)?;

            tracing::debug!(command = ?cmd, bridge = %bridge, "dispatching command");
            commands::dispatch(cmd, &engine, &global)
                .await
                .map_err(|e| e.with_url(&bridge))
        }
    }
}
