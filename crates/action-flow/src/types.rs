//! Core types for replay runs

use std::collections::BTreeMap;
use std::time::Duration;

use action_locator::{ResolverConfig, StrategyAttempt};
use action_primitives::ExecutorConfig;
use chrono::{DateTime, Utc};
use replayer_core_types::{ActionKind, StrategyTag, DEFAULT_STEP_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ReplayError;

/// Run lifecycle: `Pending -> Running -> {Completed, Failed, Aborted}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Aborted,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Aborted
        )
    }
}

/// Step lifecycle: `Queued -> Resolving -> Executing -> {Succeeded, Skipped, StepFailed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Queued,
    Resolving,
    Executing,
    Succeeded,
    StepFailed,
    Skipped,
}

/// Recorded result of one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Zero-based position in the workflow.
    pub index: usize,
    pub action: ActionKind,
    pub label: Option<String>,
    pub status: StepStatus,
    pub critical: bool,
    /// Strategy of the winning candidate.
    pub strategy: Option<StrategyTag>,
    pub candidate_index: Option<usize>,
    /// Candidates tried by the locator.
    pub resolution: Vec<StrategyAttempt>,
    /// Action attempts, retries included.
    pub attempts: u32,
    pub latency_ms: u64,
    pub error: Option<ReplayError>,
}

impl StepOutcome {
    pub fn new(index: usize, action: ActionKind) -> Self {
        Self {
            index,
            action,
            label: None,
            status: StepStatus::Queued,
            critical: false,
            strategy: None,
            candidate_index: None,
            resolution: Vec::new(),
            attempts: 0,
            latency_ms: 0,
            error: None,
        }
    }

    pub fn skipped(index: usize, action: ActionKind, label: Option<String>) -> Self {
        Self {
            label,
            status: StepStatus::Skipped,
            ..Self::new(index, action)
        }
    }

    pub fn with_status(mut self, status: StepStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_error(mut self, error: ReplayError) -> Self {
        self.status = StepStatus::StepFailed;
        self.error = Some(error);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Succeeded
    }
}

/// Everything observable about one replay run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub workflow: String,
    pub status: RunStatus,
    pub steps: Vec<StepOutcome>,
    /// Values read by extract steps, keyed by step index.
    pub extracted: BTreeMap<usize, String>,
    /// First fatal error, if the run did not complete.
    pub fatal_error: Option<ReplayError>,
    pub fatal_step: Option<usize>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub latency_ms: u64,
}

impl RunResult {
    pub fn new(workflow: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            workflow: workflow.into(),
            status: RunStatus::Pending,
            steps: Vec::new(),
            extracted: BTreeMap::new(),
            fatal_error: None,
            fatal_step: None,
            started_at: now,
            finished_at: now,
            latency_ms: 0,
        }
    }

    pub fn with_step(mut self, outcome: StepOutcome) -> Self {
        self.steps.push(outcome);
        self
    }

    /// Record the first fatal error; later ones are ignored.
    pub fn with_fatal(mut self, error: ReplayError) -> Self {
        if self.fatal_error.is_none() {
            self.fatal_step = error.step();
            self.fatal_error = Some(error);
        }
        self
    }

    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.status = status;
        self
    }

    /// Set finish time and calculate latency
    pub fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self.latency_ms = (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self
    }

    pub fn succeeded(&self) -> usize {
        self.steps.iter().filter(|s| s.is_success()).count()
    }

    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Orchestrator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayConfig {
    /// Step timeout when the step does not set one.
    pub default_step_timeout: Duration,
    pub resolver: ResolverConfig,
    pub executor: ExecutorConfig,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            default_step_timeout: Duration::from_millis(DEFAULT_STEP_TIMEOUT_MS),
            resolver: ResolverConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl ReplayConfig {
    pub fn default_step_timeout_ms(&self) -> u64 {
        self.default_step_timeout.as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fatal_error_wins() {
        let result = RunResult::new("w")
            .with_fatal(ReplayError::TargetNotFound {
                step: 1,
                attempts: vec![],
            })
            .with_fatal(ReplayError::SessionError("late".into()));
        assert_eq!(result.fatal_step, Some(1));
        assert!(matches!(
            result.fatal_error,
            Some(ReplayError::TargetNotFound { .. })
        ));
    }

    #[test]
    fn run_result_serializes_extracted_by_index() {
        let mut result = RunResult::new("w").with_status(RunStatus::Completed).finish();
        result.extracted.insert(3, "42".into());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["extracted"]["3"], "42");
        assert!(RunStatus::Aborted.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }
}
