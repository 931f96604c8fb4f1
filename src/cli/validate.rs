use action_flow::ReplayError;
use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use super::context::CliContext;
use super::exit::Exit;
use super::output::{print_json, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Workflow name
    pub name: String,
}

pub async fn cmd_validate(args: ValidateArgs, ctx: &CliContext) -> Result<Exit> {
    let workflow = ctx
        .store()
        .load(&args.name)
        .await
        .map_err(|err| ReplayError::from_store(&args.name, err))
        .with_context(|| format!("Validation of '{}' failed", args.name))?;

    match ctx.output() {
        OutputFormat::Json => print_json(&json!({
            "name": workflow.name,
            "valid": true,
            "steps": workflow.len(),
        }))?,
        OutputFormat::Human => {
            println!("Workflow '{}' is valid ({} steps)", workflow.name, workflow.len());
        }
    }
    Ok(Exit::Success)
}
