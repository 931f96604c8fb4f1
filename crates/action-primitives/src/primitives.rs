//! Action executor trait and default implementation

mod assert;
mod click;
mod extract;
mod navigate;
mod select;
mod type_text;
mod wait;

pub use navigate::validate_url;

use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::{ElementRef, PageHandle};
use chrono::Utc;
use replayer_core_types::ActionKind;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::{
    errors::{ActionError, ActionFailure},
    types::{ActionOutcome, ActionRequest, ExecutorConfig},
    waiting,
};

/// Performs one action against the live page.
///
/// Each call mutates at most one element or the page location; extract and
/// assert have no side effect.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(
        &self,
        page: &dyn PageHandle,
        request: &ActionRequest,
    ) -> Result<ActionOutcome, ActionFailure>;
}

/// State shared by the primitives during one attempt.
pub(crate) struct ActionCtx<'a> {
    pub page: &'a dyn PageHandle,
    pub request: &'a ActionRequest,
    pub config: &'a ExecutorConfig,
    pub deadline: Instant,
}

impl<'a> ActionCtx<'a> {
    pub fn target(&self) -> Result<&'a ElementRef, ActionError> {
        self.request.target.as_ref().ok_or_else(|| {
            ActionError::InvalidValue(format!("{} requires a resolved target", self.request.kind))
        })
    }

    pub fn value(&self) -> Result<&'a str, ActionError> {
        self.request
            .value
            .as_deref()
            .ok_or_else(|| ActionError::InvalidValue(format!("{} requires a value", self.request.kind)))
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub async fn wait_interactable(&self, element: &ElementRef) -> Result<(), ActionError> {
        waiting::wait_interactable(self.page, element, self.deadline, self.config.interactable_poll)
            .await
    }
}

/// Default executor: dispatches on the action kind and retries transient
/// failures after a fixed backoff.
#[derive(Debug, Clone, Default)]
pub struct DefaultActionExecutor {
    config: ExecutorConfig,
}

impl DefaultActionExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    async fn attempt(
        &self,
        page: &dyn PageHandle,
        request: &ActionRequest,
        deadline: Instant,
    ) -> Result<Option<String>, ActionError> {
        let ctx = ActionCtx {
            page,
            request,
            config: &self.config,
            deadline,
        };
        match request.kind {
            ActionKind::Navigate => navigate::execute_navigate(&ctx).await,
            ActionKind::Click => click::execute_click(&ctx).await,
            ActionKind::Type => type_text::execute_type(&ctx).await,
            ActionKind::Select => select::execute_select(&ctx).await,
            ActionKind::Wait => wait::execute_wait(&ctx).await,
            ActionKind::Extract => extract::execute_extract(&ctx).await,
            ActionKind::Assert => assert::execute_assert(&ctx).await,
        }
    }
}

#[async_trait]
impl ActionExecutor for DefaultActionExecutor {
    async fn execute(
        &self,
        page: &dyn PageHandle,
        request: &ActionRequest,
    ) -> Result<ActionOutcome, ActionFailure> {
        let started_at = Utc::now();
        let start = Instant::now();
        // Every attempt and backoff shares the step timeout.
        let deadline = start + request.timeout;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self.attempt(page, request, deadline).await {
                Ok(extracted) => {
                    let latency_ms = start.elapsed().as_millis() as u64;
                    info!(
                        action_id = %request.action_id,
                        kind = %request.kind,
                        attempts,
                        latency_ms,
                        "Action completed successfully"
                    );
                    return Ok(ActionOutcome::success(request.kind, started_at, latency_ms)
                        .with_extracted(extracted)
                        .with_attempts(attempts));
                }
                Err(error)
                    if error.is_retryable()
                        && attempts <= self.config.max_retries
                        && Instant::now() < deadline =>
                {
                    let backoff = self
                        .config
                        .retry_backoff
                        .min(deadline.saturating_duration_since(Instant::now()));
                    warn!(
                        action_id = %request.action_id,
                        kind = %request.kind,
                        attempt = attempts,
                        %error,
                        backoff_ms = backoff.as_millis() as u64,
                        "Transient action failure, retrying"
                    );
                    sleep(backoff).await;
                }
                Err(error) => {
                    let latency_ms = start.elapsed().as_millis() as u64;
                    warn!(
                        action_id = %request.action_id,
                        kind = %request.kind,
                        attempts,
                        %error,
                        "Action failed"
                    );
                    return Err(ActionFailure {
                        error,
                        attempts,
                        latency_ms,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_adapter::fake::{FakeElement, FakePage, Interaction};
    use cdp_adapter::ElementQuery;

    const STEP_TIMEOUT: Duration = Duration::from_secs(1);

    async fn target(page: &FakePage, id: &str) -> ElementRef {
        page.query(&ElementQuery::attribute("id", id))
            .await
            .unwrap()
            .element
            .unwrap()
    }

    fn executor() -> DefaultActionExecutor {
        DefaultActionExecutor::default()
    }

    #[tokio::test]
    async fn navigate_loads_url() {
        let page = FakePage::new();
        let request =
            ActionRequest::new(ActionKind::Navigate, STEP_TIMEOUT).with_value("https://example.com/login");
        let outcome = executor().execute(&page, &request).await.unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(
            page.journal(),
            vec![Interaction::Navigate("https://example.com/login".into())]
        );
    }

    #[tokio::test]
    async fn invalid_url_fails_without_retry() {
        let page = FakePage::new();
        let request = ActionRequest::new(ActionKind::Navigate, STEP_TIMEOUT).with_value("not a url");
        let failure = executor().execute(&page, &request).await.unwrap_err();
        assert_eq!(failure.attempts, 1);
        assert!(matches!(failure.error, ActionError::InvalidValue(_)));
        assert!(page.journal().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_navigation_failure_is_retried_once() {
        let page = FakePage::new();
        page.fail_navigations(1);
        let request = ActionRequest::new(ActionKind::Navigate, STEP_TIMEOUT).with_value("about:blank");
        let outcome = executor().execute(&page, &request).await.unwrap();
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.latency_ms >= 250);
    }

    #[tokio::test(start_paused = true)]
    async fn second_transient_failure_surfaces() {
        let page = FakePage::with_elements([FakeElement::new("btn").id("btn").fail_clicks(2)]);
        let request = ActionRequest::new(ActionKind::Click, STEP_TIMEOUT)
            .with_target(target(&page, "btn").await);
        let failure = executor().execute(&page, &request).await.unwrap_err();
        assert_eq!(failure.attempts, 2);
        assert!(matches!(failure.error, ActionError::CdpIo { .. }));
        assert!(page.journal().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn click_waits_for_enabled_target() {
        let page = FakePage::with_elements([FakeElement::new("btn")
            .id("btn")
            .interactable_after(Duration::from_millis(300))]);
        let request = ActionRequest::new(ActionKind::Click, STEP_TIMEOUT)
            .with_target(target(&page, "btn").await);
        let outcome = executor().execute(&page, &request).await.unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(page.journal(), vec![Interaction::Click("btn".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_target_fails_within_step_timeout() {
        let page = FakePage::with_elements([FakeElement::new("btn").id("btn").disabled()]);
        let timeout = Duration::from_millis(200);
        let request = ActionRequest::new(ActionKind::Click, timeout)
            .with_target(target(&page, "btn").await);
        let start = Instant::now();
        let failure = executor().execute(&page, &request).await.unwrap_err();
        assert_eq!(start.elapsed(), timeout);
        assert_eq!(failure.attempts, 1);
        assert!(matches!(failure.error, ActionError::NotInteractable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_backoff_is_capped_by_step_timeout() {
        let page = FakePage::with_elements([FakeElement::new("btn").id("btn").fail_clicks(2)]);
        let executor = DefaultActionExecutor::new(ExecutorConfig {
            retry_backoff: Duration::from_secs(5),
            ..ExecutorConfig::default()
        });
        let timeout = Duration::from_millis(300);
        let request = ActionRequest::new(ActionKind::Click, timeout)
            .with_target(target(&page, "btn").await);
        let start = Instant::now();
        let failure = executor.execute(&page, &request).await.unwrap_err();
        assert_eq!(start.elapsed(), timeout);
        assert_eq!(failure.attempts, 2);
        assert!(matches!(failure.error, ActionError::CdpIo { .. }));
    }

    #[tokio::test]
    async fn type_replaces_field_content() {
        let page = FakePage::with_elements([FakeElement::new("user").id("user")]);
        let user = target(&page, "user").await;
        for text in ["first", "alice"] {
            let request = ActionRequest::new(ActionKind::Type, STEP_TIMEOUT)
                .with_target(user.clone())
                .with_value(text);
            executor().execute(&page, &request).await.unwrap();
        }
        assert_eq!(page.value_of("user").as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn select_missing_option_fails() {
        let page = FakePage::with_elements([FakeElement::new("country")
            .id("country")
            .option("de", "Germany")]);
        let country = target(&page, "country").await;

        let ok = ActionRequest::new(ActionKind::Select, STEP_TIMEOUT)
            .with_target(country.clone())
            .with_value("Germany");
        executor().execute(&page, &ok).await.unwrap();
        assert_eq!(page.selected_of("country").as_deref(), Some("de"));

        let missing = ActionRequest::new(ActionKind::Select, STEP_TIMEOUT)
            .with_target(country)
            .with_value("Atlantis");
        let failure = executor().execute(&page, &missing).await.unwrap_err();
        assert_eq!(failure.attempts, 1);
        assert!(matches!(failure.error, ActionError::OptionNotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_without_target_is_capped_by_timeout() {
        let page = FakePage::new();
        let start = Instant::now();
        let request = ActionRequest::new(ActionKind::Wait, Duration::from_millis(300)).with_value("5s");
        executor().execute(&page, &request).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn extract_reads_text_and_attributes() {
        let page = FakePage::with_elements([FakeElement::new("total")
            .id("total")
            .attr("data-amount", "42.50")
            .text("  Total: 42.50 EUR ")]);
        let total = target(&page, "total").await;

        let text = ActionRequest::new(ActionKind::Extract, STEP_TIMEOUT).with_target(total.clone());
        let outcome = executor().execute(&page, &text).await.unwrap();
        assert_eq!(outcome.extracted.as_deref(), Some("Total: 42.50 EUR"));

        let attr = ActionRequest::new(ActionKind::Extract, STEP_TIMEOUT)
            .with_target(total.clone())
            .with_value("data-amount");
        let outcome = executor().execute(&page, &attr).await.unwrap();
        assert_eq!(outcome.extracted.as_deref(), Some("42.50"));

        let missing = ActionRequest::new(ActionKind::Extract, STEP_TIMEOUT)
            .with_target(total)
            .with_value("href");
        let failure = executor().execute(&page, &missing).await.unwrap_err();
        assert_eq!(failure.error, ActionError::MissingAttribute("href".into()));
        assert!(page.journal().is_empty());
    }

    #[tokio::test]
    async fn assert_checks_text_containment() {
        let page = FakePage::with_elements([FakeElement::new("banner")
            .id("banner")
            .text("Welcome back, alice")]);
        let banner = target(&page, "banner").await;

        let pass = ActionRequest::new(ActionKind::Assert, STEP_TIMEOUT)
            .with_target(banner.clone())
            .with_value("Welcome");
        tokio_test::assert_ok!(executor().execute(&page, &pass).await);

        let exists = ActionRequest::new(ActionKind::Assert, STEP_TIMEOUT).with_target(banner.clone());
        tokio_test::assert_ok!(executor().execute(&page, &exists).await);

        let fail = ActionRequest::new(ActionKind::Assert, STEP_TIMEOUT)
            .with_target(banner)
            .with_value("Goodbye");
        let failure = executor().execute(&page, &fail).await.unwrap_err();
        assert!(failure.error.is_assertion());
        assert_eq!(failure.attempts, 1);
    }
}
