use anyhow::{Context, Result};

use super::context::CliContext;
use super::exit::Exit;
use super::output::{print_json, OutputFormat};

pub async fn cmd_list(ctx: &CliContext) -> Result<Exit> {
    let dir = &ctx.config().workflows_dir;
    let names = ctx
        .store()
        .list()
        .await
        .with_context(|| format!("Cannot list workflows in {}", dir.display()))?;

    match ctx.output() {
        OutputFormat::Json => print_json(&names)?,
        OutputFormat::Human if names.is_empty() => {
            println!("No workflows found in {}", dir.display());
        }
        OutputFormat::Human => {
            for name in &names {
                println!("{name}");
            }
        }
    }
    Ok(Exit::Success)
}
