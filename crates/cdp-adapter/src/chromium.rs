//! Chromium-backed sessions driven through `chromiumoxide`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::page::{ElementQuery, ElementRef, ElementState, PageHandle, QueryMatch};
use crate::session::{LiveSession, SessionFactory};
use crate::{scripts, AdapterError, AdapterErrorKind, CdpConfig};

const CLOSE_GRACE: Duration = Duration::from_secs(5);

fn cdp_error(err: CdpError) -> AdapterError {
    AdapterError::cdp_io(err.to_string()).retriable(true)
}

/// Launches one isolated Chromium instance per session.
#[derive(Clone, Debug, Default)]
pub struct ChromiumLauncher {
    config: CdpConfig,
}

impl ChromiumLauncher {
    pub fn new(config: CdpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CdpConfig {
        &self.config
    }

    fn browser_config(&self, profile: &TempDir) -> Result<BrowserConfig, AdapterError> {
        let cfg = &self.config;
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile.path())
            .request_timeout(Duration::from_millis(cfg.request_timeout_ms))
            .launch_timeout(Duration::from_millis(cfg.launch_timeout_ms))
            .window_size(cfg.window_width, cfg.window_height);

        if !cfg.headless {
            builder = builder.with_head();
        }

        let mut args = vec![
            "--disable-background-networking",
            "--disable-default-apps",
            "--disable-dev-shm-usage",
            "--disable-extensions",
            "--disable-popup-blocking",
            "--disable-sync",
            "--no-first-run",
            "--no-default-browser-check",
            "--password-store=basic",
            "--use-mock-keychain",
        ];
        if cfg.headless {
            args.push("--hide-scrollbars");
            args.push("--mute-audio");
        }
        builder = builder.args(args);

        match cfg.resolve_executable() {
            Some(path) => {
                if !path.exists() {
                    return Err(AdapterError::new(AdapterErrorKind::LaunchFailed)
                        .with_hint(format!("chrome executable not found at {}", path.display()))
                        .with_data(json!({
                            "expected": path,
                            "hint": "Set REPLAYER_CHROME to the full path of chrome/chromium."
                        })));
                }
                builder = builder.chrome_executable(path);
            }
            None => {
                return Err(AdapterError::new(AdapterErrorKind::LaunchFailed)
                    .with_hint("no chrome/chromium executable detected")
                    .with_data(json!({
                        "hint": "Install Chrome or set REPLAYER_CHROME / browser.executable."
                    })));
            }
        }

        builder.build().map_err(|err| {
            AdapterError::new(AdapterErrorKind::LaunchFailed)
                .with_hint(format!("browser config error: {err}"))
        })
    }

    fn profile_dir(&self) -> Result<TempDir, AdapterError> {
        let result = match &self.config.profile_root {
            Some(root) => std::fs::create_dir_all(root)
                .and_then(|_| tempfile::Builder::new().prefix("replayer-").tempdir_in(root)),
            None => tempfile::Builder::new().prefix("replayer-").tempdir(),
        };
        result.map_err(|err| {
            AdapterError::new(AdapterErrorKind::LaunchFailed)
                .with_hint(format!("failed to create profile directory: {err}"))
        })
    }
}

#[async_trait]
impl SessionFactory for ChromiumLauncher {
    async fn open(&self) -> Result<Box<dyn LiveSession>, AdapterError> {
        let profile = self.profile_dir()?;
        let config = self.browser_config(&profile)?;
        let launch_timeout = Duration::from_millis(self.config.launch_timeout_ms);

        let (browser, mut handler) = tokio::time::timeout(launch_timeout, Browser::launch(config))
            .await
            .map_err(|_| {
                AdapterError::new(AdapterErrorKind::LaunchFailed)
                    .with_hint(format!("browser did not start within {launch_timeout:?}"))
            })?
            .map_err(|err| {
                AdapterError::new(AdapterErrorKind::LaunchFailed)
                    .with_hint(format!("failed to launch chromium: {err}"))
            })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp-adapter", %err, "browser handler event error");
                }
            }
        });

        let mut session = ChromiumSession {
            browser: Some(browser),
            handler: Some(handler_task),
            page: None,
            profile: Some(profile),
            closed: false,
        };

        let page = match session.new_page().await {
            Ok(page) => page,
            Err(err) => {
                let _ = session.close().await;
                return Err(err);
            }
        };
        session.page = Some(Arc::new(ChromiumPage::new(
            page,
            Duration::from_millis(self.config.request_timeout_ms),
        )));

        info!(
            target: "cdp-adapter",
            headless = self.config.headless,
            profile = ?session.profile_path(),
            "Browser session opened"
        );
        Ok(Box::new(session))
    }
}

/// A launched browser together with its handler task and throwaway profile.
pub struct ChromiumSession {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    page: Option<Arc<ChromiumPage>>,
    profile: Option<TempDir>,
    closed: bool,
}

impl ChromiumSession {
    async fn new_page(&self) -> Result<Page, AdapterError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| AdapterError::new(AdapterErrorKind::SessionClosed))?;
        browser.new_page("about:blank").await.map_err(|err| {
            AdapterError::new(AdapterErrorKind::LaunchFailed)
                .with_hint(format!("failed to open page: {err}"))
        })
    }

    fn profile_path(&self) -> Option<PathBuf> {
        self.profile.as_ref().map(|dir| dir.path().to_path_buf())
    }
}

#[async_trait]
impl LiveSession for ChromiumSession {
    fn page(&self) -> Arc<dyn PageHandle> {
        match &self.page {
            Some(page) => page.clone(),
            None => Arc::new(ClosedPage),
        }
    }

    async fn close(&mut self) -> Result<(), AdapterError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.page = None;

        let mut outcome = Ok(());
        if let Some(mut browser) = self.browser.take() {
            if let Err(err) = browser.close().await {
                warn!(target: "cdp-adapter", %err, "browser close command failed");
                outcome = Err(cdp_error(err));
            }
            match tokio::time::timeout(CLOSE_GRACE, browser.wait()).await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => warn!(target: "cdp-adapter", %err, "waiting for browser exit failed"),
                Err(_) => {
                    warn!(target: "cdp-adapter", "browser did not exit in time; killing");
                    let _ = browser.kill().await;
                }
            }
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        if let Some(profile) = self.profile.take() {
            if let Err(err) = profile.close() {
                debug!(target: "cdp-adapter", %err, "failed to remove profile directory");
            }
        }

        info!(target: "cdp-adapter", "Browser session closed");
        outcome
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

/// The page of a live Chromium session.
pub struct ChromiumPage {
    page: Page,
    request_timeout: Duration,
}

impl ChromiumPage {
    fn new(page: Page, request_timeout: Duration) -> Self {
        Self {
            page,
            request_timeout,
        }
    }

    async fn eval(&self, script: String) -> Result<Value, AdapterError> {
        let result = tokio::time::timeout(self.request_timeout, self.page.evaluate(script))
            .await
            .map_err(|_| {
                AdapterError::cdp_io("script evaluation timed out").retriable(true)
            })?
            .map_err(cdp_error)?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn expect_ok(&self, script: String, element: &ElementRef) -> Result<(), AdapterError> {
        let value = self.eval(script).await?;
        match value.get("status").and_then(Value::as_str) {
            Some("ok") => Ok(()),
            Some("option-not-found") => Err(AdapterError::new(AdapterErrorKind::OptionNotFound)),
            Some("detached") => Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("{element} is no longer attached"))
                .retriable(true)),
            other => Err(AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("unexpected script status: {other:?}"))),
        }
    }
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), AdapterError> {
        debug!(target: "cdp-adapter", url, "navigating");
        tokio::time::timeout(timeout, self.page.goto(url.to_string()))
            .await
            .map_err(|_| {
                AdapterError::new(AdapterErrorKind::NavTimeout)
                    .with_hint(format!("navigation to {url} exceeded {timeout:?}"))
                    .retriable(true)
            })?
            .map_err(cdp_error)?;
        Ok(())
    }

    async fn query(&self, query: &ElementQuery) -> Result<QueryMatch, AdapterError> {
        let value = self.eval(scripts::query_script(query)).await?;
        if value.get("status").and_then(Value::as_str) == Some("invalid") {
            let reason = value
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("invalid selector");
            return Err(AdapterError::new(AdapterErrorKind::InvalidQuery)
                .with_hint(reason.to_string())
                .with_data(json!({ "query": query })));
        }

        let count = value.get("count").and_then(Value::as_u64).unwrap_or(0) as usize;
        let selector = value.get("selector").and_then(Value::as_str);
        Ok(match (count, selector) {
            (1, Some(selector)) => QueryMatch::unique(ElementRef::new(selector)),
            (0, _) => QueryMatch::none(),
            (n, _) => QueryMatch::ambiguous(n),
        })
    }

    async fn element_state(&self, element: &ElementRef) -> Result<ElementState, AdapterError> {
        let value = self.eval(scripts::state_script(element.as_str())).await?;
        serde_json::from_value(value).map_err(|err| {
            AdapterError::new(AdapterErrorKind::Internal)
                .with_hint(format!("malformed element state: {err}"))
        })
    }

    async fn click(&self, element: &ElementRef) -> Result<(), AdapterError> {
        let handle = self
            .page
            .find_element(element.as_str())
            .await
            .map_err(cdp_error)?;
        handle.click().await.map_err(cdp_error)?;
        Ok(())
    }

    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<(), AdapterError> {
        self.expect_ok(scripts::clear_script(element.as_str()), element)
            .await?;
        let handle = self
            .page
            .find_element(element.as_str())
            .await
            .map_err(cdp_error)?;
        handle.focus().await.map_err(cdp_error)?;
        handle.type_str(text).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn select_option(
        &self,
        element: &ElementRef,
        option: &str,
    ) -> Result<(), AdapterError> {
        self.expect_ok(scripts::select_script(element.as_str(), option), element)
            .await
            .map_err(|err| match err.kind {
                AdapterErrorKind::OptionNotFound => {
                    err.with_hint(format!("no option '{option}' in {element}"))
                }
                _ => err,
            })
    }

    async fn read_text(&self, element: &ElementRef) -> Result<Option<String>, AdapterError> {
        let value = self.eval(scripts::text_script(element.as_str())).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn read_attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, AdapterError> {
        let handle = self
            .page
            .find_element(element.as_str())
            .await
            .map_err(cdp_error)?;
        handle.attribute(name).await.map_err(cdp_error)
    }

    async fn current_url(&self) -> Result<Option<String>, AdapterError> {
        self.page.url().await.map_err(cdp_error)
    }

    async fn release(&self, element: &ElementRef) -> Result<(), AdapterError> {
        self.eval(scripts::release_script(element.as_str())).await?;
        Ok(())
    }
}

/// Page returned by a session that has already been closed.
struct ClosedPage;

impl ClosedPage {
    fn closed<T>() -> Result<T, AdapterError> {
        Err(AdapterError::new(AdapterErrorKind::SessionClosed))
    }
}

#[async_trait]
impl PageHandle for ClosedPage {
    async fn navigate(&self, _url: &str, _timeout: Duration) -> Result<(), AdapterError> {
        Self::closed()
    }

    async fn query(&self, _query: &ElementQuery) -> Result<QueryMatch, AdapterError> {
        Self::closed()
    }

    async fn element_state(&self, _element: &ElementRef) -> Result<ElementState, AdapterError> {
        Self::closed()
    }

    async fn click(&self, _element: &ElementRef) -> Result<(), AdapterError> {
        Self::closed()
    }

    async fn type_text(&self, _element: &ElementRef, _text: &str) -> Result<(), AdapterError> {
        Self::closed()
    }

    async fn select_option(
        &self,
        _element: &ElementRef,
        _option: &str,
    ) -> Result<(), AdapterError> {
        Self::closed()
    }

    async fn read_text(&self, _element: &ElementRef) -> Result<Option<String>, AdapterError> {
        Self::closed()
    }

    async fn read_attribute(
        &self,
        _element: &ElementRef,
        _name: &str,
    ) -> Result<Option<String>, AdapterError> {
        Self::closed()
    }

    async fn current_url(&self) -> Result<Option<String>, AdapterError> {
        Self::closed()
    }

    async fn release(&self, _element: &ElementRef) -> Result<(), AdapterError> {
        Self::closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_page_rejects_every_call() {
        let page = ClosedPage;
        let err = page.navigate("about:blank", Duration::from_secs(1)).await.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::SessionClosed);
        let err = page.query(&ElementQuery::css("a")).await.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::SessionClosed);
    }

    #[test]
    fn missing_executable_fails_before_launch() {
        let launcher = ChromiumLauncher::new(CdpConfig {
            executable: Some(PathBuf::from("/definitely/not/a/chrome")),
            ..CdpConfig::default()
        });
        let profile = launcher.profile_dir().unwrap();
        let err = launcher.browser_config(&profile).unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::LaunchFailed);
        assert!(err.hint.unwrap().contains("/definitely/not/a/chrome"));
    }
}
