//! Command dispatch: bridges CLI args -> engine operations -> output formatting.

pub mod config_cmd;
pub mod layout;
pub mod presets;
pub mod routing;
pub mod run;
pub mod util;

use patchbay_core::Engine;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an engine-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status => routing::status(engine, global).await,
        Command::Ports(args) => routing::ports(engine, args, global).await,
        Command::Connections(args) => routing::connections(engine, args, global).await,
        Command::Connect(args) => routing::connect(engine, args, global).await,
        Command::Disconnect(args) => routing::disconnect(engine, args, global).await,
        Command::Bulk(args) => routing::bulk(engine, args, global).await,
        Command::Clear => routing::clear(engine, global).await,
        Command::Presets(args) => presets::handle(engine, args, global).await,
        Command::Layout(args) => layout::handle(engine, args, global).await,
        Command::Run(args) => run::handle(engine, args, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
    }
}
