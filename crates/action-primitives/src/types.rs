//! Core data types for the action executor

use std::time::Duration;

use cdp_adapter::ElementRef;
use chrono::{DateTime, Utc};
use replayer_core_types::ActionKind;
use serde::{Deserialize, Serialize};

/// Default number of retries after a transient failure.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Default pause before a retry.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;

/// One action to perform against the page.
///
/// `target` is the element already resolved by the locator; `value` has had
/// its placeholders substituted.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub kind: ActionKind,
    pub target: Option<ElementRef>,
    pub value: Option<String>,
    pub timeout: Duration,
    /// Unique identifier for tracing and correlation
    pub action_id: String,
}

impl ActionRequest {
    pub fn new(kind: ActionKind, timeout: Duration) -> Self {
        Self {
            kind,
            target: None,
            value: None,
            timeout,
            action_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_target(mut self, target: ElementRef) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_optional_value(mut self, value: Option<String>) -> Self {
        self.value = value;
        self
    }
}

/// Report of a successful action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub kind: ActionKind,
    /// Value read by an extract action.
    pub extracted: Option<String>,
    /// Attempts made, including the successful one.
    pub attempts: u32,
    pub started_at: DateTime<Utc>,
    pub latency_ms: u64,
}

impl ActionOutcome {
    pub fn success(kind: ActionKind, started_at: DateTime<Utc>, latency_ms: u64) -> Self {
        Self {
            kind,
            extracted: None,
            attempts: 1,
            started_at,
            latency_ms,
        }
    }

    pub fn with_extracted(mut self, extracted: Option<String>) -> Self {
        self.extracted = extracted;
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

/// Executor tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub max_retries: u32,
    pub retry_backoff: Duration,
    /// Delay between two interactability checks.
    pub interactable_poll: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            interactable_poll: Duration::from_millis(50),
        }
    }
}
