use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use super::context::CliContext;
use super::dispatch::dispatch;
use super::env::CliArgs;
use super::exit::Exit;
use super::runtime::{apply_runtime_overrides, init_logging, load_config, LoadedConfig};

pub async fn run() -> ExitCode {
    let cli = CliArgs::parse();

    match execute(&cli).await {
        Ok(exit) => {
            info!(code = exit.code(), "Command finished");
            exit.into()
        }
        Err(err) => {
            let exit = Exit::for_anyhow(&err);
            error!(code = exit.code(), "Command failed: {:#}", err);
            eprintln!("Error: {err:#}");
            exit.into()
        }
    }
}

async fn execute(cli: &CliArgs) -> Result<Exit> {
    init_logging(&cli.log_level, cli.debug, cli.output)?;

    info!("Starting replayer v{}", env!("CARGO_PKG_VERSION"));

    let LoadedConfig { mut config, path } = load_config(cli.config.as_ref()).await?;
    apply_runtime_overrides(&mut config);
    let ctx = CliContext::new(config, path, cli.output);

    dispatch(cli, &ctx).await
}
