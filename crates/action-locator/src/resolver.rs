//! Ordered candidate resolution with per-candidate polling windows

use std::time::Duration;

use async_trait::async_trait;
use cdp_adapter::{AdapterErrorKind, PageHandle};
use replayer_core_types::SelectorCandidate;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::{
    errors::LocatorError,
    strategies::candidate_query,
    types::{AttemptOutcome, Resolution, ResolverConfig, StrategyAttempt},
};

/// Element resolver trait
#[async_trait]
pub trait ElementResolver: Send + Sync {
    /// Resolve the first candidate, in declared order, that uniquely matches
    /// within `timeout`.
    async fn locate(
        &self,
        page: &dyn PageHandle,
        candidates: &[SelectorCandidate],
        timeout: Duration,
    ) -> Result<Resolution, LocatorError>;
}

/// Resolver that polls each candidate inside its share of the timeout.
///
/// With `n` candidates, candidate `i` may poll until `start + (i + 1) * timeout / n`.
/// Time an earlier candidate leaves unused (ambiguous or invalid) rolls forward.
#[derive(Debug, Clone, Default)]
pub struct PollingResolver {
    config: ResolverConfig,
}

impl PollingResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    async fn poll_candidate(
        &self,
        page: &dyn PageHandle,
        candidate: &SelectorCandidate,
        deadline: Instant,
    ) -> Result<(AttemptOutcome, u32, Option<cdp_adapter::ElementRef>), LocatorError> {
        let query = match candidate_query(candidate) {
            Ok(query) => query,
            Err(reason) => return Ok((AttemptOutcome::Invalid { reason }, 0, None)),
        };

        let mut polls = 0u32;
        loop {
            polls += 1;
            match page.query(&query).await {
                Ok(found) if found.is_unique() => {
                    return Ok((AttemptOutcome::Matched, polls, found.element));
                }
                Ok(found) if found.count > 1 => {
                    return Ok((AttemptOutcome::Ambiguous { count: found.count }, polls, None));
                }
                Ok(_) => {}
                Err(err) if err.kind == AdapterErrorKind::InvalidQuery => {
                    let reason = err.hint.unwrap_or_else(|| err.kind.to_string());
                    return Ok((AttemptOutcome::Invalid { reason }, polls, None));
                }
                Err(err) if err.retriable => {
                    debug!(candidate = %candidate, %err, "transient query failure");
                }
                Err(err) => return Err(LocatorError::Page(err)),
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok((AttemptOutcome::NoMatch, polls, None));
            }
            sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }
}

#[async_trait]
impl ElementResolver for PollingResolver {
    async fn locate(
        &self,
        page: &dyn PageHandle,
        candidates: &[SelectorCandidate],
        timeout: Duration,
    ) -> Result<Resolution, LocatorError> {
        let start = Instant::now();
        let total = candidates.len() as u32;
        let mut attempts = Vec::with_capacity(candidates.len());

        for (index, candidate) in candidates.iter().enumerate() {
            let deadline = start + timeout * (index as u32 + 1) / total;
            debug!(
                candidate = %candidate,
                index,
                window_ms = deadline.saturating_duration_since(Instant::now()).as_millis() as u64,
                "Trying selector candidate"
            );

            let (outcome, polls, element) = self.poll_candidate(page, candidate, deadline).await?;
            attempts.push(StrategyAttempt {
                candidate: candidate.clone(),
                outcome: outcome.clone(),
                polls,
            });

            match (outcome, element) {
                (AttemptOutcome::Matched, Some(element)) => {
                    let elapsed = start.elapsed();
                    info!(
                        strategy = %candidate.strategy,
                        candidate_index = index,
                        latency_ms = elapsed.as_millis() as u64,
                        "Resolved target"
                    );
                    return Ok(Resolution {
                        element,
                        candidate_index: index,
                        candidate: candidate.clone(),
                        attempts,
                        elapsed,
                    });
                }
                (AttemptOutcome::Ambiguous { count }, _) => {
                    warn!(candidate = %candidate, count, "Ambiguous candidate skipped");
                }
                (AttemptOutcome::Invalid { reason }, _) => {
                    warn!(candidate = %candidate, %reason, "Invalid candidate skipped");
                }
                _ => {
                    debug!(candidate = %candidate, polls, "Candidate window closed without a match");
                }
            }
        }

        Err(LocatorError::TargetNotFound { attempts })
    }
}
