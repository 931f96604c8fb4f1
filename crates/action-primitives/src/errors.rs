//! Error types for the action executor

use cdp_adapter::{AdapterError, AdapterErrorKind};
use thiserror::Error;

/// Error types for a single action attempt
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    /// Navigation did not settle in time
    #[error("Navigation timeout: {0}")]
    NavTimeout(String),

    /// Target never became visible and enabled
    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    /// Target left the document between resolution and use
    #[error("Element detached: {0}")]
    Detached(String),

    /// Step value unusable for the action (bad URL, bad duration, missing text)
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Dropdown option was not found
    #[error("Option not found in dropdown: {0}")]
    OptionNotFound(String),

    /// Extract asked for an attribute the element does not carry
    #[error("Attribute '{0}' not present on target")]
    MissingAttribute(String),

    /// Assertion evaluated to false
    #[error("Assertion failed: expected text containing '{expected}', found '{actual}'")]
    AssertionFailed { expected: String, actual: String },

    /// CDP communication or protocol error
    #[error("CDP I/O error: {message}")]
    CdpIo { message: String, retriable: bool },

    /// Page unusable (session closed, internal adapter failure)
    #[error("Page error: {0}")]
    Page(String),
}

impl ActionError {
    /// Transient failures the executor retries once.
    pub fn is_retryable(&self) -> bool {
        match self {
            ActionError::NavTimeout(_)
            | ActionError::NotInteractable(_)
            | ActionError::Detached(_) => true,
            ActionError::CdpIo { retriable, .. } => *retriable,
            _ => false,
        }
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self, ActionError::AssertionFailed { .. })
    }

    pub fn from_adapter(err: AdapterError) -> Self {
        let message = err.to_string();
        let detail = err.hint.clone().unwrap_or_else(|| message.clone());
        match err.kind {
            AdapterErrorKind::NavTimeout => ActionError::NavTimeout(detail),
            AdapterErrorKind::TargetNotFound => ActionError::Detached(detail),
            AdapterErrorKind::OptionNotFound => ActionError::OptionNotFound(detail),
            AdapterErrorKind::CdpIo => ActionError::CdpIo {
                message,
                retriable: err.retriable,
            },
            AdapterErrorKind::LaunchFailed
            | AdapterErrorKind::InvalidQuery
            | AdapterErrorKind::SessionClosed
            | AdapterErrorKind::Internal => ActionError::Page(message),
        }
    }
}

impl From<AdapterError> for ActionError {
    fn from(err: AdapterError) -> Self {
        ActionError::from_adapter(err)
    }
}

/// Final failure of an action after its retry budget is spent.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{error} (after {attempts} attempt(s))")]
pub struct ActionFailure {
    pub error: ActionError,
    pub attempts: u32,
    pub latency_ms: u64,
}
