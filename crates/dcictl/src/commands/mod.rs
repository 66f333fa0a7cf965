//! Command handlers, one module per top-level subcommand.

pub mod config_cmd;
pub mod inventory;
pub mod sites;
pub mod slicings;
pub mod util;
pub mod wan_nodes;

use crate::cli::{Command, GlobalOpts};
use crate::config::Context;
use crate::error::CliError;

/// Dispatch a command that needs the state file and backends.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Sites(args) => sites::handle(ctx, args, global).await,
        Command::WanNodes(args) => wan_nodes::handle(ctx, args, global).await,
        Command::Slicings(args) => slicings::handle(ctx, args, global).await,
        Command::Inventory(args) => inventory::handle(ctx, args, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal {
            message: "command does not use the state file".into(),
        }),
    }
}
