//! Replay orchestrator
//!
//! Drives one run through `Pending -> Running -> {Completed, Failed, Aborted}`.
//! Steps execute strictly in order against the single page of a session that
//! is opened after variables resolve and closed on every exit path.

use std::collections::BTreeMap;
use std::sync::Arc;

use action_locator::{ElementResolver, LocatorError, PollingResolver};
use action_primitives::{ActionExecutor, ActionRequest, DefaultActionExecutor};
use cdp_adapter::{PageHandle, SessionFactory};
use replayer_core_types::{SelectorCandidate, Step, Workflow};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use workflow_store::WorkflowStore;

use crate::errors::ReplayError;
use crate::types::{ReplayConfig, RunResult, RunStatus, StepOutcome, StepStatus};
use crate::variables::{BindingSet, EnvSource, VariableResolver};

/// Replays recorded workflows deterministically.
pub struct ReplayOrchestrator {
    store: Arc<dyn WorkflowStore>,
    sessions: Arc<dyn SessionFactory>,
    variables: VariableResolver,
    locator: Arc<dyn ElementResolver>,
    executor: Arc<dyn ActionExecutor>,
    config: ReplayConfig,
}

impl ReplayOrchestrator {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        sessions: Arc<dyn SessionFactory>,
        env: Arc<EnvSource>,
        config: ReplayConfig,
    ) -> Self {
        Self {
            store,
            sessions,
            variables: VariableResolver::new(env),
            locator: Arc::new(PollingResolver::new(config.resolver)),
            executor: Arc::new(DefaultActionExecutor::new(config.executor)),
            config,
        }
    }

    pub fn with_locator(mut self, locator: Arc<dyn ElementResolver>) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn variables(&self) -> &VariableResolver {
        &self.variables
    }

    /// Load `name` from the store and replay it.
    ///
    /// Only `NotFound` and `Malformed` come back as `Err`; every other failure
    /// is recorded in the returned run result.
    pub async fn replay(
        &self,
        name: &str,
        overrides: &BTreeMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<RunResult, ReplayError> {
        let workflow = self
            .store
            .load(name)
            .await
            .map_err(|err| ReplayError::from_store(name, err))?;
        Ok(self.run_workflow(&workflow, overrides, cancel).await)
    }

    /// Replay an already loaded workflow.
    pub async fn run_workflow(
        &self,
        workflow: &Workflow,
        overrides: &BTreeMap<String, String>,
        cancel: &CancellationToken,
    ) -> RunResult {
        let run = RunResult::new(&workflow.name);
        info!(
            run_id = %run.run_id,
            workflow = %workflow.name,
            steps = workflow.len(),
            "Starting replay"
        );

        let bindings = match self.variables.resolve(workflow, overrides) {
            Ok(bindings) => bindings,
            Err(err) => {
                warn!(run_id = %run.run_id, %err, "Variable resolution failed");
                return run.with_fatal(err).with_status(RunStatus::Failed).finish();
            }
        };

        let mut session = match self.sessions.open().await {
            Ok(session) => session,
            Err(err) => {
                warn!(run_id = %run.run_id, %err, "Failed to open browser session");
                return run
                    .with_fatal(ReplayError::SessionError(err.to_string()))
                    .with_status(RunStatus::Failed)
                    .finish();
            }
        };

        let page = session.page();
        let run = self
            .run_steps(workflow, &bindings, page.as_ref(), cancel, run.with_status(RunStatus::Running))
            .await;
        drop(page);

        if let Err(err) = session.close().await {
            warn!(run_id = %run.run_id, %err, "Browser session did not close cleanly");
        }

        let run = run.finish();
        info!(
            run_id = %run.run_id,
            workflow = %run.workflow,
            status = ?run.status,
            succeeded = run.succeeded(),
            failed = run.count(StepStatus::StepFailed),
            skipped = run.count(StepStatus::Skipped),
            latency_ms = run.latency_ms,
            "Replay finished"
        );
        run
    }

    async fn run_steps(
        &self,
        workflow: &Workflow,
        bindings: &BindingSet,
        page: &dyn PageHandle,
        cancel: &CancellationToken,
        mut run: RunResult,
    ) -> RunResult {
        let mut halted: Option<RunStatus> = None;

        for (index, step) in workflow.steps.iter().enumerate() {
            let label = step.label().map(str::to_string);
            if halted.is_none() && cancel.is_cancelled() {
                info!(run_id = %run.run_id, step = index, "Cancellation observed, aborting run");
                run = run.with_fatal(ReplayError::Aborted { completed: index });
                halted = Some(RunStatus::Aborted);
            }
            if halted.is_some() {
                run = run.with_step(StepOutcome::skipped(index, step.action_kind, label));
                continue;
            }

            let (outcome, extracted) = self.run_step(run.run_id, index, step, bindings, page).await;
            if let Some(error) = outcome.error.clone() {
                if step.action_kind.is_assertion() && !step.is_critical() {
                    warn!(
                        run_id = %run.run_id,
                        step = index,
                        %error,
                        "Non-critical assertion step failed, continuing"
                    );
                } else {
                    warn!(run_id = %run.run_id, step = index, %error, "Fatal step failure");
                    run = run.with_fatal(error);
                    halted = Some(RunStatus::Failed);
                }
            }
            if let Some(value) = extracted {
                run.extracted.insert(index, value);
            }
            run = run.with_step(outcome);
        }

        let status = halted.unwrap_or(RunStatus::Completed);
        run.with_status(status)
    }

    async fn run_step(
        &self,
        run_id: Uuid,
        index: usize,
        step: &Step,
        bindings: &BindingSet,
        page: &dyn PageHandle,
    ) -> (StepOutcome, Option<String>) {
        let started = Instant::now();
        let timeout = step.timeout(self.config.default_step_timeout_ms());
        let kind = step.action_kind;
        let mut outcome = StepOutcome::new(index, kind);
        outcome.label = step.label().map(str::to_string);
        outcome.critical = step.is_critical();

        let target = if step.has_target() {
            outcome.status = StepStatus::Resolving;
            debug!(%run_id, step = index, action = %kind, "Resolving step target");
            let candidates: Vec<SelectorCandidate> = step
                .selector_candidates
                .iter()
                .map(|c| SelectorCandidate::new(c.strategy, bindings.substitute(&c.value)))
                .collect();

            match self.locator.locate(page, &candidates, timeout).await {
                Ok(resolution) => {
                    outcome.strategy = Some(resolution.strategy());
                    outcome.candidate_index = Some(resolution.candidate_index);
                    outcome.resolution = resolution.attempts;
                    Some(resolution.element)
                }
                Err(LocatorError::TargetNotFound { attempts }) => {
                    outcome.resolution = attempts.clone();
                    outcome.latency_ms = started.elapsed().as_millis() as u64;
                    return (
                        outcome.with_error(ReplayError::TargetNotFound {
                            step: index,
                            attempts,
                        }),
                        None,
                    );
                }
                Err(LocatorError::Page(err)) => {
                    outcome.latency_ms = started.elapsed().as_millis() as u64;
                    return (
                        outcome.with_error(ReplayError::ActionFailed {
                            step: index,
                            action: kind,
                            reason: format!("page unavailable during resolution: {err}"),
                            assertion: false,
                        }),
                        None,
                    );
                }
            }
        } else {
            None
        };

        outcome.status = StepStatus::Executing;
        debug!(%run_id, step = index, action = %kind, "Executing step");
        let mut request = ActionRequest::new(kind, timeout)
            .with_optional_value(step.value.as_deref().map(|v| bindings.substitute(v)));
        if let Some(element) = target {
            request = request.with_target(element);
        }

        let result = self.executor.execute(page, &request).await;
        if let Some(element) = &request.target {
            if let Err(err) = page.release(element).await {
                debug!(%run_id, step = index, %element, %err, "Target release failed");
            }
        }
        outcome.latency_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(action) => {
                outcome.attempts = action.attempts;
                info!(
                    %run_id,
                    step = index,
                    action = %kind,
                    strategy = outcome.strategy.map(|s| s.name()).unwrap_or("-"),
                    latency_ms = outcome.latency_ms,
                    "Step succeeded"
                );
                (outcome.with_status(StepStatus::Succeeded), action.extracted)
            }
            Err(failure) => {
                outcome.attempts = failure.attempts;
                let error = ReplayError::ActionFailed {
                    step: index,
                    action: kind,
                    reason: failure.error.to_string(),
                    assertion: failure.error.is_assertion(),
                };
                (outcome.with_error(error), None)
            }
        }
    }
}
