use action_flow::{required_variables, ReplayError};
use anyhow::{Context, Result};
use clap::Args;
use replayer_core_types::{Step, Workflow};
use serde::Serialize;

use super::context::CliContext;
use super::exit::Exit;
use super::output::{print_json, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct InspectArgs {
    /// Workflow name
    pub name: String,
}

#[derive(Debug, Serialize)]
struct Inspection<'a> {
    name: &'a str,
    steps: &'a [Step],
    required_variables: Vec<String>,
    /// Required names the environment source cannot supply.
    unresolved: Vec<String>,
}

fn describe_step(index: usize, step: &Step) -> String {
    let mut line = format!("  [{index:>2}] {}", step.action_kind.name());
    if let Some(label) = step.label() {
        line.push_str(&format!(" \"{label}\""));
    }
    if let Some(value) = &step.value {
        line.push_str(&format!(" value={value:?}"));
    }
    if let Some(timeout) = step.timeout_ms {
        line.push_str(&format!(" timeout={timeout}ms"));
    }
    if step.is_critical() {
        line.push_str(" critical");
    }
    for (position, candidate) in step.selector_candidates.iter().enumerate() {
        line.push_str(&format!("\n         {}. {candidate}", position + 1));
    }
    line
}

fn render(workflow: &Workflow, required: &[String], unresolved: &[String]) -> String {
    let mut lines = vec![format!(
        "Workflow '{}' ({} steps)",
        workflow.name,
        workflow.len()
    )];
    lines.extend(
        workflow
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| describe_step(index, step)),
    );
    if required.is_empty() {
        lines.push("Variables: none".to_string());
    } else {
        lines.push(format!("Variables: {}", required.join(", ")));
    }
    if !unresolved.is_empty() {
        lines.push(format!("Unresolved: {}", unresolved.join(", ")));
    }
    lines.join("\n")
}

pub async fn cmd_inspect(args: InspectArgs, ctx: &CliContext) -> Result<Exit> {
    let workflow = ctx
        .store()
        .load(&args.name)
        .await
        .map_err(|err| ReplayError::from_store(&args.name, err))
        .with_context(|| format!("Cannot inspect workflow '{}'", args.name))?;

    let env = ctx.env_source().await?;
    let required = required_variables(&workflow);
    let unresolved: Vec<String> = required
        .iter()
        .filter(|name| env.get(name).is_none())
        .cloned()
        .collect();

    match ctx.output() {
        OutputFormat::Json => print_json(&Inspection {
            name: &workflow.name,
            steps: &workflow.steps,
            required_variables: required,
            unresolved,
        })?,
        OutputFormat::Human => println!("{}", render(&workflow, &required, &unresolved)),
    }
    Ok(Exit::Success)
}
