//! Browsing session layer for the replay engine.
//!
//! This crate owns the lifecycle of the live browser (open, isolate, close) and
//! exposes the page to the upper layers through the [`PageHandle`] trait. The
//! Chromium implementation drives the browser over the DevTools Protocol via
//! `chromiumoxide`; an in-memory [`fake`] page backs the test suites.

use std::{env, path::PathBuf};

use which::which;

mod chromium;
pub mod page;
mod scripts;
pub mod session;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

pub use chromium::{ChromiumLauncher, ChromiumPage, ChromiumSession};
pub use config::CdpConfig;
pub use error::{AdapterError, AdapterErrorKind};
pub use page::{ElementQuery, ElementRef, ElementState, PageHandle, QueryMatch};
pub use session::{LiveSession, SessionFactory};

pub mod error {
    use serde::{Deserialize, Serialize};
    use std::fmt;
    use thiserror::Error;

    /// High-level error categories surfaced by the adapter.
    #[derive(Clone, Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
    pub enum AdapterErrorKind {
        #[error("browser launch failed")]
        LaunchFailed,
        #[error("navigation timed out")]
        NavTimeout,
        #[error("cdp i/o failure")]
        CdpIo,
        #[error("target element not found")]
        TargetNotFound,
        #[error("option not found")]
        OptionNotFound,
        #[error("invalid element query")]
        InvalidQuery,
        #[error("session closed")]
        SessionClosed,
        #[error("internal error")]
        Internal,
    }

    /// Enriched error metadata passed back to higher layers.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AdapterError {
        pub kind: AdapterErrorKind,
        pub hint: Option<String>,
        pub retriable: bool,
        pub data: Option<serde_json::Value>,
    }

    impl fmt::Display for AdapterError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.kind)?;
            if let Some(hint) = &self.hint {
                write!(f, ": {}", hint)?;
            }
            Ok(())
        }
    }

    impl std::error::Error for AdapterError {}

    impl AdapterError {
        pub fn new(kind: AdapterErrorKind) -> Self {
            Self {
                kind,
                hint: None,
                retriable: false,
                data: None,
            }
        }

        pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
            self.hint = Some(hint.into());
            self
        }

        pub fn retriable(mut self, flag: bool) -> Self {
            self.retriable = flag;
            self
        }

        pub fn with_data(mut self, data: serde_json::Value) -> Self {
            self.data = Some(data);
            self
        }

        pub fn cdp_io(hint: impl Into<String>) -> Self {
            Self::new(AdapterErrorKind::CdpIo).with_hint(hint)
        }
    }
}

pub mod config {
    use crate::detect_chrome_executable;
    use serde::{Deserialize, Serialize};
    use std::{env, path::PathBuf};

    /// Configuration for launching the browser behind a session.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(default)]
    pub struct CdpConfig {
        /// Browser binary; auto-detected when unset.
        pub executable: Option<PathBuf>,
        pub headless: bool,
        pub launch_timeout_ms: u64,
        /// Upper bound for a single DevTools request.
        pub request_timeout_ms: u64,
        pub window_width: u32,
        pub window_height: u32,
        /// Parent directory for the per-session throwaway profiles.
        pub profile_root: Option<PathBuf>,
    }

    impl Default for CdpConfig {
        fn default() -> Self {
            Self {
                executable: None,
                headless: resolve_headless_default(),
                launch_timeout_ms: 30_000,
                request_timeout_ms: 30_000,
                window_width: 1280,
                window_height: 720,
                profile_root: None,
            }
        }
    }

    impl CdpConfig {
        /// Executable to launch: the configured path, else auto-detection.
        pub fn resolve_executable(&self) -> Option<PathBuf> {
            self.executable
                .clone()
                .filter(|path| !path.as_os_str().is_empty())
                .or_else(detect_chrome_executable)
        }
    }

    fn resolve_headless_default() -> bool {
        // REPLAYER_HEADLESS: "0", "false", "no", "off" means headful
        match env::var("REPLAYER_HEADLESS") {
            Ok(value) => {
                let lower = value.to_ascii_lowercase();
                !matches!(lower.as_str(), "0" | "false" | "no" | "off")
            }
            Err(_) => true,
        }
    }
}

fn detect_chrome_executable() -> Option<PathBuf> {
    if let Ok(raw) = env::var("REPLAYER_CHROME") {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            let candidate = PathBuf::from(trimmed);
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    let skip_defaults = env::var("REPLAYER_SKIP_OS_PATHS")
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);

    if !skip_defaults {
        for candidate in os_specific_chrome_paths() {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(any(target_os = "macos", target_os = "linux", target_os = "freebsd"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }

    #[cfg(not(any(
        target_os = "windows",
        target_os = "macos",
        target_os = "linux",
        target_os = "freebsd"
    )))]
    {
        &["chrome"]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let mut paths = Vec::new();
        for key in ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"] {
            if let Ok(value) = env::var(key) {
                let root = PathBuf::from(value.trim());
                paths.push(root.join("Google/Chrome/Application/chrome.exe"));
                paths.push(root.join("Chromium/Application/chrome.exe"));
            }
        }
        paths
    }

    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
        ]
    }

    #[cfg(not(any(
        target_os = "windows",
        target_os = "macos",
        target_os = "linux",
        target_os = "freebsd"
    )))]
    {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{chrome_executable_names, detect_chrome_executable, CdpConfig};
    use serial_test::serial;
    use std::{env, fs, path::PathBuf};

    #[test]
    #[serial]
    fn detects_from_env_var() {
        let dir = tempfile::tempdir().unwrap();
        let exe_path = dir.path().join("my-chrome");
        fs::write(&exe_path, b"").unwrap();
        let original = env::var("REPLAYER_CHROME").ok();
        env::set_var("REPLAYER_CHROME", exe_path.to_string_lossy().to_string());
        let detected = detect_chrome_executable();
        match original {
            Some(value) => env::set_var("REPLAYER_CHROME", value),
            None => env::remove_var("REPLAYER_CHROME"),
        }
        assert_eq!(detected, Some(exe_path));
    }

    #[test]
    #[serial]
    fn detects_from_path_entries() {
        let dir = tempfile::tempdir().unwrap();
        let name = chrome_executable_names()[0];
        let exe_path = dir.path().join(name);
        fs::write(&exe_path, b"").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&exe_path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        let original_path = env::var("PATH").ok();
        let original_env = env::var("REPLAYER_CHROME").ok();
        env::set_var("REPLAYER_CHROME", "");
        env::set_var("REPLAYER_SKIP_OS_PATHS", "1");
        env::set_var("PATH", dir.path());
        let detected = detect_chrome_executable();
        if let Some(value) = original_path {
            env::set_var("PATH", value);
        }
        match original_env {
            Some(value) => env::set_var("REPLAYER_CHROME", value),
            None => env::remove_var("REPLAYER_CHROME"),
        }
        env::remove_var("REPLAYER_SKIP_OS_PATHS");
        assert_eq!(detected, Some(exe_path));
    }

    #[test]
    #[serial]
    fn configured_executable_wins() {
        let config = CdpConfig {
            executable: Some(PathBuf::from("/opt/custom/chrome")),
            ..CdpConfig::default()
        };
        assert_eq!(
            config.resolve_executable(),
            Some(PathBuf::from("/opt/custom/chrome"))
        );
    }

    #[test]
    #[serial]
    fn headless_env_override() {
        env::set_var("REPLAYER_HEADLESS", "off");
        assert!(!CdpConfig::default().headless);
        env::set_var("REPLAYER_HEADLESS", "1");
        assert!(CdpConfig::default().headless);
        env::remove_var("REPLAYER_HEADLESS");
    }
}
