use std::fmt::Write as _;
use std::time::Duration;

use action_flow::{RunResult, RunStatus, StepOutcome, StepStatus};
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{rendered}");
    Ok(())
}

fn status_label(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Queued => "queued",
        StepStatus::Resolving => "resolving",
        StepStatus::Executing => "executing",
        StepStatus::Succeeded => "ok",
        StepStatus::StepFailed => "FAILED",
        StepStatus::Skipped => "skipped",
    }
}

fn run_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Pending => "pending",
        RunStatus::Running => "running",
        RunStatus::Completed => "completed",
        RunStatus::Failed => "failed",
        RunStatus::Aborted => "aborted",
    }
}

fn render_step(out: &mut String, step: &StepOutcome) {
    let _ = write!(
        out,
        "  [{:>2}] {:<8} {:<8}",
        step.index,
        step.action.name(),
        status_label(step.status)
    );
    if let Some(label) = &step.label {
        let _ = write!(out, " {label}");
    }
    if let (Some(strategy), Some(candidate)) = (step.strategy, step.candidate_index) {
        let _ = write!(out, " via {strategy} (candidate {})", candidate + 1);
    }
    if step.status != StepStatus::Skipped {
        let _ = write!(
            out,
            " in {}",
            humantime::format_duration(Duration::from_millis(step.latency_ms))
        );
    }
    if step.attempts > 1 {
        let _ = write!(out, ", {} attempts", step.attempts);
    }
    out.push('\n');
    if let Some(error) = &step.error {
        let _ = writeln!(out, "       {error}");
    }
}

/// Human-readable run summary.
pub fn render_run(run: &RunResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Workflow '{}' {} in {} (run {})",
        run.workflow,
        run_label(run.status),
        humantime::format_duration(Duration::from_millis(run.latency_ms)),
        run.run_id
    );
    for step in &run.steps {
        render_step(&mut out, step);
    }
    if !run.extracted.is_empty() {
        out.push_str("Extracted:\n");
        for (index, value) in &run.extracted {
            let _ = writeln!(out, "  [{index:>2}] {value}");
        }
    }
    let _ = write!(
        out,
        "{} succeeded, {} failed, {} skipped",
        run.succeeded(),
        run.count(StepStatus::StepFailed),
        run.count(StepStatus::Skipped)
    );
    if let Some(error) = &run.fatal_error {
        let _ = write!(out, "\nError: {error}");
    }
    out
}
