//! Core types for the locator

use std::fmt;
use std::time::Duration;

use cdp_adapter::ElementRef;
use replayer_core_types::{SelectorCandidate, StrategyTag};
use serde::{Deserialize, Serialize};

/// Default delay between two queries of the same candidate.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Last observation made for a candidate before moving on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Exactly one element matched; the candidate was selected.
    Matched,
    /// Nothing matched before the candidate's window closed.
    NoMatch,
    /// More than one element matched.
    Ambiguous { count: usize },
    /// The locator could not be evaluated.
    Invalid { reason: String },
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptOutcome::Matched => f.write_str("matched"),
            AttemptOutcome::NoMatch => f.write_str("no match"),
            AttemptOutcome::Ambiguous { count } => write!(f, "ambiguous ({count} matches)"),
            AttemptOutcome::Invalid { reason } => write!(f, "invalid ({reason})"),
        }
    }
}

/// One candidate tried during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyAttempt {
    pub candidate: SelectorCandidate,
    pub outcome: AttemptOutcome,
    /// Number of queries issued for this candidate.
    pub polls: u32,
}

impl fmt::Display for StrategyAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.candidate, self.outcome)
    }
}

/// Successful resolution of a step target.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub element: ElementRef,
    /// Position of the winning candidate in the declared list.
    pub candidate_index: usize,
    pub candidate: SelectorCandidate,
    /// Every candidate tried, the winning one last.
    pub attempts: Vec<StrategyAttempt>,
    pub elapsed: Duration,
}

impl Resolution {
    pub fn strategy(&self) -> StrategyTag {
        self.candidate.strategy
    }
}

/// Locator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub poll_interval: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl ResolverConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
