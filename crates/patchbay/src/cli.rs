//! Clap derive structures for the `patchbay` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// patchbay -- route JACK audio through a remote bridge
#[derive(Debug, Parser)]
#[command(
    name = "patchbay",
    version,
    about = "Manage JACK audio routing through a remote bridge",
    long_about = "Connects, disconnects and restores JACK port connections on a\n\
        routing daemon reached over HTTP. Keeps a tracked copy of the graph,\n\
        persists it to a layout file, and applies named presets.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "PATCHBAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Bridge URL (overrides the config file)
    #[arg(long, short = 'u', env = "PATCHBAY_URL", global = true)]
    pub url: Option<String>,

    /// Layout file (overrides the config file)
    #[arg(long, env = "PATCHBAY_LAYOUT_FILE", global = true)]
    pub layout: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "PATCHBAY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show bridge health, JACK status and optional capabilities
    Status,

    /// List ports known to the bridge
    #[command(alias = "p")]
    Ports(PortsArgs),

    /// List current connections
    #[command(alias = "conn", alias = "c")]
    Connections(ConnectionsArgs),

    /// Connect a source port to a destination port
    Connect(PairArgs),

    /// Disconnect a source port from a destination port
    #[command(alias = "dc")]
    Disconnect(PairArgs),

    /// Connect or disconnect several pairs at once
    Bulk(BulkArgs),

    /// Remove every connection
    Clear,

    /// List, validate and apply presets
    #[command(alias = "pr")]
    Presets(PresetsArgs),

    /// Save or restore the persisted layout
    Layout(LayoutArgs),

    /// Run as a daemon: restore, autosave, log events until interrupted
    Run(RunArgs),

    /// Inspect or initialize the configuration file
    Config(ConfigArgs),
}

// ── Routing ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PortsArgs {
    /// Only show ports whose name contains this text
    #[arg(long, short = 'f')]
    pub filter: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConnectionsArgs {
    /// Show the locally tracked graph without asking the bridge
    #[arg(long)]
    pub tracked: bool,
}

#[derive(Debug, Args)]
pub struct PairArgs {
    /// Source port (client:port)
    pub from: String,
    /// Destination port (client:port)
    pub to: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BulkAction {
    Connect,
    Disconnect,
}

#[derive(Debug, Args)]
pub struct BulkArgs {
    /// What to do with each pair
    pub action: BulkAction,

    /// Pairs as `source=destination`
    #[arg(required = true, value_parser = parse_pair)]
    pub pairs: Vec<(String, String)>,
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((from, to)) if !from.is_empty() && !to.is_empty() => {
            Ok((from.to_owned(), to.to_owned()))
        }
        _ => Err(format!("expected source=destination, got {s:?}")),
    }
}

// ── Presets ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PresetsArgs {
    #[command(subcommand)]
    pub command: PresetsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PresetsCommand {
    /// List configured presets
    #[command(alias = "ls")]
    List,

    /// Resolve a preset's aliases without touching the graph
    Validate {
        /// Preset name
        name: String,
    },

    /// Apply a preset
    Apply {
        /// Preset name
        name: String,

        /// Resolve and report only
        #[arg(long)]
        dry_run: bool,

        /// Keep existing connections instead of clearing first
        #[arg(long)]
        no_clear: bool,
    },
}

// ── Layout ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LayoutArgs {
    #[command(subcommand)]
    pub command: LayoutCommand,
}

#[derive(Debug, Subcommand)]
pub enum LayoutCommand {
    /// Snapshot the current graph to the layout file
    Save,

    /// Replace the graph with the saved layout
    Restore,

    /// Print the saved layout without applying it
    Show,
}

// ── Daemon ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Autosave interval, e.g. `30s` or `2m` (overrides the config file)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub autosave: Option<Duration>,

    /// Skip the startup restore
    #[arg(long)]
    pub no_restore: bool,

    /// Also write logs to this file (overrides `[logging] file`)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn pair_parser() {
        assert_eq!(
            parse_pair("system:capture_1=system:playback_1").unwrap(),
            ("system:capture_1".into(), "system:playback_1".into())
        );
        assert!(parse_pair("system:capture_1").is_err());
        assert!(parse_pair("=system:playback_1").is_err());
    }

    #[test]
    fn apply_flags() {
        let cli = Cli::try_parse_from(["patchbay", "presets", "apply", "monitor", "--dry-run"])
            .unwrap();
        match cli.command {
            Command::Presets(PresetsArgs {
                command:
                    PresetsCommand::Apply {
                        name,
                        dry_run,
                        no_clear,
                    },
            }) => {
                assert_eq!(name, "monitor");
                assert!(dry_run);
                assert!(!no_clear);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
