use super::env::CliArgs;
use super::inspect::cmd_inspect;
use super::list::cmd_list;
use super::replay::cmd_replay;
use super::validate::cmd_validate;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use crate::cli::exit::Exit;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<Exit> {
    match cli.command.clone() {
        Commands::Replay(args) => cmd_replay(args, ctx).await,
        Commands::List => cmd_list(ctx).await,
        Commands::Inspect(args) => cmd_inspect(args, ctx).await,
        Commands::Validate(args) => cmd_validate(args, ctx).await,
    }
}
