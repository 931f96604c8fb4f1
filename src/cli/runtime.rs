use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::output::OutputFormat;
use crate::config::Config;

/// Install the global subscriber. `RUST_LOG` wins over `level`; `debug`
/// forces DEBUG. Logs go to stderr so JSON results on stdout stay parseable.
pub fn init_logging(level: &str, debug: bool, output: OutputFormat) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(filter);

    match output {
        OutputFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        OutputFormat::Human => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    }
    .context("Failed to initialise logging")?;

    Ok(())
}

#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    pub path: Option<PathBuf>,
}

fn default_config_path() -> Option<PathBuf> {
    // Priority: ./config/config.yaml > ~/.config/replayer/config.yaml
    let local_config = PathBuf::from("config/config.yaml");
    if local_config.exists() {
        return Some(local_config);
    }
    dirs::config_dir().map(|mut path| {
        path.push("replayer");
        path.push("config.yaml");
        path
    })
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let explicit = config_path.is_some();
    let Some(config_path) = config_path.cloned().or_else(default_config_path) else {
        warn!("No configuration directory available, using defaults");
        return Ok(LoadedConfig {
            config: Config::default(),
            path: None,
        });
    };

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;

        info!("Loaded configuration from: {}", config_path.display());
        Ok(LoadedConfig {
            config,
            path: Some(config_path),
        })
    } else if explicit {
        anyhow::bail!("Config file not found: {}", config_path.display())
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Ok(LoadedConfig {
            config: Config::default(),
            path: None,
        })
    }
}

pub fn apply_runtime_overrides(config: &mut Config) {
    config.apply_env_overrides();
}
