//! Schema checks that serde alone cannot express.

use replayer_core_types::{ActionKind, Workflow};

/// Validate a parsed workflow, returning every issue found.
pub fn validate_workflow(workflow: &Workflow) -> Result<(), Vec<String>> {
    let mut issues = Vec::new();

    if workflow.name.trim().is_empty() {
        issues.push("workflow name cannot be empty".to_string());
    }

    for (index, step) in workflow.steps.iter().enumerate() {
        let position = index + 1;
        let kind = step.action_kind;

        if kind.requires_target() && step.selector_candidates.is_empty() {
            issues.push(format!(
                "step {position} ({kind}) requires at least one selector candidate"
            ));
        }

        for candidate in &step.selector_candidates {
            if candidate.value.trim().is_empty() {
                issues.push(format!(
                    "step {position} ({kind}) has an empty '{}' locator",
                    candidate.strategy
                ));
            }
        }

        let has_value = step
            .value
            .as_deref()
            .map(|value| !value.is_empty())
            .unwrap_or(false);

        if kind.requires_value() && !has_value {
            issues.push(format!("step {position} ({kind}) requires a value"));
        }

        if kind == ActionKind::Wait && !step.has_target() && !has_value {
            issues.push(format!(
                "step {position} (wait) needs either a target or a duration value"
            ));
        }

        if step.timeout_ms == Some(0) {
            issues.push(format!("step {position} ({kind}) has a zero timeout"));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
