use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use replayer_core_types::Workflow;

use crate::{validate_workflow, StoreError, WorkflowStore};

/// Map-backed store. Workflows are validated on insert, so `load` never
/// yields a malformed workflow.
#[derive(Clone, Default)]
pub struct InMemoryWorkflowStore {
    inner: Arc<RwLock<BTreeMap<String, Workflow>>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workflows(workflows: impl IntoIterator<Item = Workflow>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.inner.write();
            for workflow in workflows {
                guard.insert(workflow.name.clone(), workflow);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn load(&self, name: &str) -> Result<Workflow, StoreError> {
        let workflow = self
            .inner
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        validate_workflow(&workflow).map_err(|issues| StoreError::malformed(name, issues.join("; ")))?;
        Ok(workflow)
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.read().keys().cloned().collect())
    }

    async fn save(&self, workflow: &Workflow) -> Result<(), StoreError> {
        validate_workflow(workflow)
            .map_err(|issues| StoreError::malformed(&workflow.name, issues.join("; ")))?;
        self.inner
            .write()
            .insert(workflow.name.clone(), workflow.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replayer_core_types::Step;

    #[tokio::test]
    async fn rerecording_overwrites() {
        let store = InMemoryWorkflowStore::new();
        store
            .save(&Workflow::new("flow", vec![Step::navigate("https://a.example")]))
            .await
            .unwrap();
        store
            .save(&Workflow::new("flow", vec![Step::navigate("https://b.example")]))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        let loaded = store.load("flow").await.unwrap();
        assert_eq!(loaded.steps[0].value.as_deref(), Some("https://b.example"));
    }

    #[tokio::test]
    async fn seeded_invalid_workflow_loads_as_malformed() {
        let store = InMemoryWorkflowStore::with_workflows([Workflow::new(
            "bad",
            vec![Step::click(vec![])],
        )]);
        assert!(matches!(
            store.load("bad").await,
            Err(StoreError::Malformed { .. })
        ));
        assert!(matches!(
            store.load("missing").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
