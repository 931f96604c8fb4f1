use std::collections::BTreeMap;
use std::future::{pending, Future};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use action_flow::{ReplayOrchestrator, RunResult};
use anyhow::{Context, Result};
use cdp_adapter::ChromiumLauncher;
use clap::Args;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::context::CliContext;
use super::exit::Exit;
use super::output::{print_json, render_run, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ReplayArgs {
    /// Workflow name
    pub name: String,

    /// Variable override, repeatable; split on the first '='
    #[arg(short = 'o', long = "override", value_name = "KEY=VALUE", value_parser = parse_override)]
    pub overrides: Vec<(String, String)>,

    /// Write the run result JSON to the output directory
    #[arg(long)]
    pub save: bool,

    /// Force headless browser
    #[arg(long, conflicts_with = "headful")]
    pub headless: bool,

    /// Force a visible browser window
    #[arg(long)]
    pub headful: bool,
}

pub fn parse_override(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("override '{raw}' has an empty key"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// The first interrupt cancels the run at the next step boundary. Resolves
/// on the second one, so the caller can exit without waiting for teardown.
async fn await_forced_interrupt<S, F>(mut signal: S, cancel: CancellationToken)
where
    S: FnMut() -> F,
    F: Future<Output = io::Result<()>>,
{
    if signal().await.is_err() {
        return pending().await;
    }
    warn!("Interrupt received, aborting after the current step (press Ctrl-C again to exit now)");
    cancel.cancel();

    if signal().await.is_err() {
        return pending().await;
    }
    warn!("Second interrupt received, exiting immediately");
}

/// Lives until the process exits so that a later Ctrl-C is never swallowed.
fn spawn_interrupt_watcher(cancel: CancellationToken) {
    tokio::spawn(async move {
        await_forced_interrupt(tokio::signal::ctrl_c, cancel).await;
        std::process::exit(i32::from(Exit::Aborted.code()));
    });
}

async fn save_run(output_dir: &Path, run: &RunResult) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .await
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let path = output_dir.join(format!("{}-{}.json", run.workflow, run.run_id));
    let body = serde_json::to_vec_pretty(run).context("Failed to serialize run result")?;
    fs::write(&path, body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

pub async fn cmd_replay(args: ReplayArgs, ctx: &CliContext) -> Result<Exit> {
    let config = ctx.config();
    let overrides: BTreeMap<String, String> = args.overrides.into_iter().collect();

    let mut cdp = config.cdp_config();
    if args.headless {
        cdp.headless = true;
    } else if args.headful {
        cdp.headless = false;
    }

    let env = ctx.env_source().await?;
    let orchestrator = ReplayOrchestrator::new(
        ctx.store(),
        Arc::new(ChromiumLauncher::new(cdp)),
        env,
        config.replay_config(),
    );

    let cancel = CancellationToken::new();
    spawn_interrupt_watcher(cancel.clone());
    let result = orchestrator.replay(&args.name, &overrides, &cancel).await;

    let run = result.with_context(|| format!("Cannot replay workflow '{}'", args.name))?;

    let saved = if args.save {
        let path = save_run(&config.output_dir, &run).await?;
        info!(path = %path.display(), run_id = %run.run_id, "Run result saved");
        Some(path)
    } else {
        None
    };

    match ctx.output() {
        OutputFormat::Json => print_json(&run)?,
        OutputFormat::Human => {
            println!("{}", render_run(&run));
            if let Some(path) = saved {
                println!("Saved to {}", path.display());
            }
        }
    }

    Ok(Exit::for_run(&run))
}
