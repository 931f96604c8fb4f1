//! Error types for the locator

use cdp_adapter::AdapterError;
use thiserror::Error;

use crate::types::StrategyAttempt;

/// Locator error enumeration
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// No candidate produced a unique match within the timeout
    #[error("Target not found after {} candidate(s): {}", .attempts.len(), summarize(.attempts))]
    TargetNotFound { attempts: Vec<StrategyAttempt> },

    /// The page could not be queried at all
    #[error("Page error: {0}")]
    Page(AdapterError),
}

impl LocatorError {
    /// Attempts recorded before giving up, empty for page errors.
    pub fn attempts(&self) -> &[StrategyAttempt] {
        match self {
            LocatorError::TargetNotFound { attempts } => attempts,
            LocatorError::Page(_) => &[],
        }
    }
}

fn summarize(attempts: &[StrategyAttempt]) -> String {
    if attempts.is_empty() {
        return "no selector candidates".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttemptOutcome;
    use replayer_core_types::SelectorCandidate;

    #[test]
    fn message_lists_each_attempt() {
        let err = LocatorError::TargetNotFound {
            attempts: vec![
                StrategyAttempt {
                    candidate: SelectorCandidate::id("user"),
                    outcome: AttemptOutcome::NoMatch,
                    polls: 3,
                },
                StrategyAttempt {
                    candidate: SelectorCandidate::css("li.row"),
                    outcome: AttemptOutcome::Ambiguous { count: 2 },
                    polls: 1,
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "Target not found after 2 candidate(s): id:user -> no match, css:li.row -> ambiguous (2 matches)"
        );
        assert_eq!(err.attempts().len(), 2);
    }
}
