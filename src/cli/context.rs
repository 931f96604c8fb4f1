use std::path::{Path, PathBuf};
use std::sync::Arc;

use action_flow::EnvSource;
use anyhow::Result;
use tokio::sync::OnceCell;
use workflow_store::{FsWorkflowStore, WorkflowStore};

use super::output::OutputFormat;
use crate::config::Config;

pub struct CliContext {
    config: Arc<Config>,
    config_path: Option<PathBuf>,
    output: OutputFormat,
    env: OnceCell<Arc<EnvSource>>,
}

impl CliContext {
    pub fn new(config: Config, config_path: Option<PathBuf>, output: OutputFormat) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
            output,
            env: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Config {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    pub fn store(&self) -> Arc<dyn WorkflowStore> {
        Arc::new(FsWorkflowStore::new(self.config.workflows_dir.clone()))
    }

    /// Environment source, read on first use and shared afterwards.
    pub async fn env_source(&self) -> Result<Arc<EnvSource>> {
        self.env
            .get_or_try_init(|| async {
                EnvSource::load(
                    self.config.env_file.as_deref(),
                    self.config.inherit_process_env,
                )
                .map(Arc::new)
                .map_err(anyhow::Error::from)
            })
            .await
            .map(Arc::clone)
    }
}
