//! Bounded exponential backoff for relay attempts

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ErrorClass, RelayError};

/// Relay retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential growth
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Calculate backoff duration for a given attempt (0-indexed)
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let backoff_secs =
            self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped = backoff_secs.min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Check if we should retry based on attempt count
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// Action to take after a failed attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryAction {
    /// Retry after a backoff period
    RetryAfter(Duration),
    /// Destination already applied the transition
    AlreadyProcessed,
    /// Stop and surface the error
    GiveUp,
}

/// Retry state for one relay
#[derive(Debug, Clone)]
pub struct RetryContext {
    pub config: RetryConfig,
    pub attempt: u32,
    pub last_error: Option<RelayError>,
}

impl RetryContext {
    pub fn with_config(config: RetryConfig) -> Self {
        Self {
            config,
            attempt: 0,
            last_error: None,
        }
    }

    /// Record a failed attempt
    pub fn record_failure(&mut self, error: RelayError) {
        self.attempt += 1;
        self.last_error = Some(error);
    }

    /// Get the decision for the next attempt
    pub fn next_action(&self) -> RetryAction {
        let Some(error) = self.last_error.as_ref() else {
            return RetryAction::GiveUp;
        };

        match error.class() {
            ErrorClass::AlreadyProcessed => {
                debug!("Destination already processed this transition");
                RetryAction::AlreadyProcessed
            }
            ErrorClass::Permanent => {
                warn!(error = %error, "Permanent error, not retrying");
                RetryAction::GiveUp
            }
            ErrorClass::Transient | ErrorClass::Unknown => {
                // attempt counts failures so far; the first failure is attempt 1
                if !self.config.should_retry(self.attempt.saturating_sub(1)) {
                    return RetryAction::GiveUp;
                }
                let backoff = self.config.backoff_for_attempt(self.attempt - 1);
                debug!(?backoff, attempt = self.attempt, "Transient error - retrying");
                RetryAction::RetryAfter(backoff)
            }
        }
    }
}

/// Outcome of [`with_retry`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Done(T),
    /// The last attempt hit an already-processed rejection
    AlreadyProcessed(RelayError),
}

/// Run `operation` until it succeeds, hits an already-processed or permanent
/// error, or the retry budget runs out.
pub async fn with_retry<F, T, Fut>(config: &RetryConfig, mut operation: F) -> Result<RetryOutcome<T>, RelayError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, RelayError>>,
{
    let mut ctx = RetryContext::with_config(config.clone());

    loop {
        match operation(ctx.attempt).await {
            Ok(result) => return Ok(RetryOutcome::Done(result)),
            Err(e) => {
                ctx.record_failure(e.clone());

                match ctx.next_action() {
                    RetryAction::RetryAfter(backoff) => {
                        warn!(
                            attempt = ctx.attempt,
                            max = config.max_retries,
                            ?backoff,
                            error = %e,
                            "Retrying after backoff"
                        );
                        crate::metrics::record_retry(e.kind());
                        tokio::time::sleep(backoff).await;
                    }
                    RetryAction::AlreadyProcessed => return Ok(RetryOutcome::AlreadyProcessed(e)),
                    RetryAction::GiveUp => return Err(e),
                }
            }
        }
    }
}
