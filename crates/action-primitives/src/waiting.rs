//! Built-in waiting for action primitives

use std::time::Duration;

use cdp_adapter::{ElementRef, PageHandle};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::errors::ActionError;

/// Poll the element until it is visible and enabled, or `deadline` passes.
pub async fn wait_interactable(
    page: &dyn PageHandle,
    element: &ElementRef,
    deadline: Instant,
    poll: Duration,
) -> Result<(), ActionError> {
    let mut checks = 0u32;
    loop {
        checks += 1;
        let state = page.element_state(element).await?;
        if state.is_interactable() {
            if checks > 1 {
                debug!(element = %element, checks, "Target became interactable");
            }
            return Ok(());
        }
        if !state.attached {
            return Err(ActionError::Detached(format!("{element} left the document")));
        }

        let now = Instant::now();
        if now >= deadline {
            let reason = if state.visible { "disabled" } else { "not visible" };
            return Err(ActionError::NotInteractable(format!(
                "{element} still {reason} after {checks} check(s)"
            )));
        }
        sleep(poll.min(deadline - now)).await;
    }
}

/// Parse a wait duration: bare integer milliseconds or a humantime string
/// such as `2s` or `1500ms`.
pub fn parse_wait_duration(value: &str) -> Result<Duration, ActionError> {
    let trimmed = value.trim();
    if let Ok(ms) = trimmed.parse::<u64>() {
        return Ok(Duration::from_millis(ms));
    }
    humantime::parse_duration(trimmed)
        .map_err(|err| ActionError::InvalidValue(format!("'{trimmed}' is not a duration: {err}")))
}
