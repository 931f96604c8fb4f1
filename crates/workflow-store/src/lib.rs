//! Workflow Store - loads recorded workflows and validates them against the
//! artifact schema before they reach the replay engine.
//!
//! Two backends are provided:
//! - [`FsWorkflowStore`]: one `<name>.json` document per workflow in a directory
//! - [`InMemoryWorkflowStore`]: map-backed store for embedding and tests

pub mod errors;
mod fs;
mod memory;
pub mod validate;

pub use errors::*;
pub use fs::FsWorkflowStore;
pub use memory::InMemoryWorkflowStore;
pub use validate::validate_workflow;

use async_trait::async_trait;
use replayer_core_types::Workflow;

/// Resolves workflow names to validated artifacts.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Load and validate the workflow stored under `name`.
    async fn load(&self, name: &str) -> Result<Workflow, StoreError>;

    /// Names of every stored workflow, sorted.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Persist `workflow` under its own name, replacing any previous recording.
    async fn save(&self, workflow: &Workflow) -> Result<(), StoreError>;
}

/// Parse raw artifact bytes into a validated [`Workflow`].
pub fn parse_workflow(name: &str, bytes: &[u8]) -> Result<Workflow, StoreError> {
    let workflow: Workflow =
        serde_json::from_slice(bytes).map_err(|err| StoreError::malformed(name, err.to_string()))?;
    validate_workflow(&workflow).map_err(|issues| StoreError::malformed(name, issues.join("; ")))?;
    Ok(workflow)
}

/// Workflow names double as file stems; reject anything that could escape
/// the store directory.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains('\0')
}
