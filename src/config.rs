//! Application configuration
//!
//! Loaded from YAML; every section and field is optional and falls back to
//! the defaults below.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use action_flow::ReplayConfig;
use action_locator::ResolverConfig;
use action_primitives::ExecutorConfig;
use cdp_adapter::CdpConfig;
use replayer_core_types::DEFAULT_STEP_TIMEOUT_MS;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Directory holding one `<name>.json` artifact per workflow.
    pub workflows_dir: PathBuf,
    /// Dotenv file read once at startup. A missing file is not an error.
    pub env_file: Option<PathBuf>,
    /// Layer the process environment above the dotenv file. Off by default:
    /// only the dotenv file feeds placeholders unless this is set.
    pub inherit_process_env: bool,
    /// Where `replay --save` writes run results.
    pub output_dir: PathBuf,
    pub browser: BrowserSettings,
    pub replay: ReplaySettings,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    pub launch_timeout_ms: u64,
    pub window_width: u32,
    pub window_height: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ReplaySettings {
    pub default_step_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub max_action_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workflows_dir: PathBuf::from("workflows"),
            env_file: Some(PathBuf::from(".env")),
            inherit_process_env: false,
            output_dir: PathBuf::from("./replayer-output"),
            browser: BrowserSettings::default(),
            replay: ReplaySettings::default(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            launch_timeout_ms: 30_000,
            window_width: 1280,
            window_height: 720,
        }
    }
}

impl Default for ReplaySettings {
    fn default() -> Self {
        let executor = ExecutorConfig::default();
        Self {
            default_step_timeout_ms: DEFAULT_STEP_TIMEOUT_MS,
            poll_interval_ms: ResolverConfig::default().poll_interval.as_millis() as u64,
            max_action_retries: executor.max_retries,
            retry_backoff_ms: executor.retry_backoff.as_millis() as u64,
        }
    }
}

impl Config {
    /// Apply `REPLAYER_HEADLESS` and `REPLAYER_CHROME` on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = env::var("REPLAYER_HEADLESS") {
            let headless = !matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            );
            if headless != self.browser.headless {
                info!(headless, "Browser headless mode overridden by REPLAYER_HEADLESS");
            }
            self.browser.headless = headless;
        }

        if let Ok(raw) = env::var("REPLAYER_CHROME") {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                info!(executable = trimmed, "Browser executable overridden by REPLAYER_CHROME");
                self.browser.executable = Some(PathBuf::from(trimmed));
            }
        }
    }

    pub fn cdp_config(&self) -> CdpConfig {
        CdpConfig {
            executable: self.browser.executable.clone(),
            headless: self.browser.headless,
            launch_timeout_ms: self.browser.launch_timeout_ms,
            window_width: self.browser.window_width,
            window_height: self.browser.window_height,
            ..CdpConfig::default()
        }
    }

    pub fn replay_config(&self) -> ReplayConfig {
        let replay = &self.replay;
        ReplayConfig {
            default_step_timeout: Duration::from_millis(replay.default_step_timeout_ms),
            resolver: ResolverConfig::default()
                .with_poll_interval(Duration::from_millis(replay.poll_interval_ms.max(1))),
            executor: ExecutorConfig {
                max_retries: replay.max_action_retries,
                retry_backoff: Duration::from_millis(replay.retry_backoff_ms),
                ..ExecutorConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str(
            "workflows_dir: /srv/flows\nbrowser:\n  headless: false\nreplay:\n  max_action_retries: 0\n",
        )
        .unwrap();

        assert_eq!(config.workflows_dir, PathBuf::from("/srv/flows"));
        assert!(!config.browser.headless);
        assert_eq!(config.browser.window_width, 1280);
        assert_eq!(config.replay.max_action_retries, 0);
        assert_eq!(config.replay.default_step_timeout_ms, DEFAULT_STEP_TIMEOUT_MS);
        assert_eq!(config.env_file, Some(PathBuf::from(".env")));
        assert!(!config.inherit_process_env);
    }

    #[test]
    fn replay_settings_map_onto_engine_config() {
        let mut config = Config::default();
        config.replay.default_step_timeout_ms = 2_000;
        config.replay.poll_interval_ms = 25;
        config.replay.retry_backoff_ms = 10;

        let replay = config.replay_config();
        assert_eq!(replay.default_step_timeout, Duration::from_secs(2));
        assert_eq!(replay.resolver.poll_interval, Duration::from_millis(25));
        assert_eq!(replay.executor.max_retries, 1);
        assert_eq!(replay.executor.retry_backoff, Duration::from_millis(10));
    }

    #[test]
    #[serial]
    fn env_overrides_browser_settings() {
        env::set_var("REPLAYER_HEADLESS", "off");
        env::set_var("REPLAYER_CHROME", "/opt/chrome/chrome");

        let mut config = Config::default();
        config.apply_env_overrides();

        env::remove_var("REPLAYER_HEADLESS");
        env::remove_var("REPLAYER_CHROME");

        assert!(!config.browser.headless);
        assert_eq!(
            config.cdp_config().executable,
            Some(PathBuf::from("/opt/chrome/chrome"))
        );
        assert!(!config.cdp_config().headless);
    }
}
