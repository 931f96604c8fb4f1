use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use replayer_core_types::Workflow;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::{is_valid_name, parse_workflow, StoreError, WorkflowStore};

const ARTIFACT_EXTENSION: &str = "json";

/// Directory-backed store holding one `<name>.json` artifact per workflow.
#[derive(Clone, Debug)]
pub struct FsWorkflowStore {
    root: PathBuf,
}

impl FsWorkflowStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{ARTIFACT_EXTENSION}"))
    }
}

#[async_trait]
impl WorkflowStore for FsWorkflowStore {
    async fn load(&self, name: &str) -> Result<Workflow, StoreError> {
        if !is_valid_name(name) {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let path = self.artifact_path(name);
        debug!(path = %path.display(), "loading workflow artifact");

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()));
            }
            Err(err) => return Err(StoreError::Io(format!("{}: {err}", path.display()))),
        };

        let workflow = parse_workflow(name, &bytes)?;
        if workflow.name != name {
            warn!(
                requested = name,
                recorded = %workflow.name,
                "workflow artifact name differs from file name"
            );
        }

        info!(workflow = name, steps = workflow.len(), "Loaded workflow");
        Ok(workflow)
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(StoreError::Io(err.to_string())),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| StoreError::Io(err.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ARTIFACT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if is_valid_name(stem) {
                    names.push(stem.to_string());
                }
            }
        }

        names.sort();
        Ok(names)
    }

    async fn save(&self, workflow: &Workflow) -> Result<(), StoreError> {
        if !is_valid_name(&workflow.name) {
            return Err(StoreError::malformed(
                &workflow.name,
                "workflow name is not usable as a file name",
            ));
        }
        crate::validate_workflow(workflow)
            .map_err(|issues| StoreError::malformed(&workflow.name, issues.join("; ")))?;

        let data = serde_json::to_vec_pretty(workflow)
            .map_err(|err| StoreError::malformed(&workflow.name, err.to_string()))?;
        let path = self.artifact_path(&workflow.name);
        write_atomic(&path, &data)
            .await
            .map_err(|err| StoreError::Io(format!("{}: {err}", path.display())))?;

        info!(workflow = %workflow.name, path = %path.display(), "Saved workflow");
        Ok(())
    }
}

async fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)
        .await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    fs::rename(tmp, path).await
}
