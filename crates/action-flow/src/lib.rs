//! Replay orchestration layer
//!
//! This crate turns a recorded workflow into a run: it resolves `{{NAME}}`
//! placeholders against overrides and the environment, opens a browsing
//! session, and walks the steps through locator and executor while recording
//! a per-step outcome.

pub mod errors;
pub mod orchestrator;
pub mod types;
pub mod variables;

pub use errors::ReplayError;
pub use orchestrator::ReplayOrchestrator;
pub use types::{ReplayConfig, RunResult, RunStatus, StepOutcome, StepStatus};
pub use variables::{
    placeholders, required_variables, BindingSet, EnvError, EnvSource, VariableResolver,
};
