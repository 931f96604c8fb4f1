//! Replay error taxonomy

use action_locator::StrategyAttempt;
use replayer_core_types::ActionKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use workflow_store::StoreError;

/// Every way a replay can fail.
///
/// `NotFound` and `Malformed` are returned to the caller before a run starts;
/// all other kinds are recorded in the run result.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ReplayError {
    #[error("workflow '{0}' not found")]
    NotFound(String),

    #[error("workflow '{name}' is malformed: {reason}")]
    Malformed { name: String, reason: String },

    #[error("missing variable(s): {}", .0.join(", "))]
    MissingVariable(Vec<String>),

    #[error("step {step}: target not found ({})", describe(.attempts))]
    TargetNotFound {
        step: usize,
        attempts: Vec<StrategyAttempt>,
    },

    #[error("step {step} ({action}) failed: {reason}")]
    ActionFailed {
        step: usize,
        action: ActionKind,
        reason: String,
        assertion: bool,
    },

    #[error("browser session error: {0}")]
    SessionError(String),

    #[error("run aborted after {completed} step(s)")]
    Aborted { completed: usize },
}

fn describe(attempts: &[StrategyAttempt]) -> String {
    if attempts.is_empty() {
        return "no selector candidates".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ReplayError {
    /// Step the error is attributed to, if any.
    pub fn step(&self) -> Option<usize> {
        match self {
            ReplayError::TargetNotFound { step, .. } | ReplayError::ActionFailed { step, .. } => {
                Some(*step)
            }
            _ => None,
        }
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, ReplayError::ActionFailed { assertion: true, .. })
    }

    /// Map a store failure for workflow `name`. An unreadable artifact counts
    /// as malformed.
    pub fn from_store(name: &str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(name) => ReplayError::NotFound(name),
            StoreError::Malformed { name, reason } => ReplayError::Malformed { name, reason },
            StoreError::Io(reason) => ReplayError::Malformed {
                name: name.to_string(),
                reason,
            },
        }
    }
}
