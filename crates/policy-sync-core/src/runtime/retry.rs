// crates/policy-sync-core/src/runtime/retry.rs
// ============================================================================
// Module: Bounded Retry
// Description: Deadline-bounded retry combinator with exponential backoff.
// Purpose: Wrap every remote call in an explicit, budgeted retry loop.
// Dependencies: crate::interfaces, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`retry_with_budget`] runs an attempt closure until it succeeds, fails with
//! an error the predicate rejects, or the budget elapses. The deadline is
//! cooperative: no attempt starts at or after it, a retryable error seen past
//! it is reported as [`RetryError::Timeout`] carrying that error, and a
//! success that returns after it is discarded as [`RetryError::Expired`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::interfaces::Clock;

// ============================================================================
// SECTION: Retry Policy
// ============================================================================

/// Default overall budget for a single remote call.
pub const DEFAULT_RETRY_BUDGET: Duration = Duration::from_secs(60);
/// Default delay before the second attempt.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
/// Default ceiling for a single backoff delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);
/// Default backoff growth factor.
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 2;

/// Budget and backoff shape for a retried call.
///
/// # Invariants
/// - A `multiplier` of 1 yields fixed-interval retries.
/// - Backoff never exceeds `max_backoff` nor the time left in `budget`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Overall time budget measured from the first attempt.
    pub budget: Duration,
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    /// Growth factor applied after each delay.
    pub multiplier: u32,
}

impl RetryPolicy {
    /// Returns a fixed-interval policy.
    #[must_use]
    pub const fn fixed(budget: Duration, interval: Duration) -> Self {
        Self {
            budget,
            initial_backoff: interval,
            max_backoff: interval,
            multiplier: 1,
        }
    }

    /// Returns the delay that follows `current`.
    #[must_use]
    pub fn next_backoff(&self, current: Duration) -> Duration {
        current.saturating_mul(self.multiplier.max(1)).min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            budget: DEFAULT_RETRY_BUDGET,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

// ============================================================================
// SECTION: Retry Errors
// ============================================================================

/// Terminal outcome of a failed retry loop.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The predicate classified the error as not retryable.
    #[error("{0}")]
    Permanent(E),
    /// The budget elapsed while the error was still retryable.
    #[error("gave up after {attempts} attempts in {}ms: {last}", .waited.as_millis())]
    Timeout {
        /// Number of attempts issued.
        attempts: u32,
        /// Time elapsed since the first attempt.
        waited: Duration,
        /// Last retryable error observed.
        last: E,
    },
    /// The deadline passed while an attempt was in flight; its result was discarded.
    #[error("deadline passed during attempt {attempts} after {}ms; result discarded", .waited.as_millis())]
    Expired {
        /// Number of attempts issued.
        attempts: u32,
        /// Time elapsed since the first attempt.
        waited: Duration,
    },
}

// ============================================================================
// SECTION: Combinator
// ============================================================================

/// Runs `attempt` until success, a non-retryable error, or budget exhaustion.
///
/// `attempt` receives the 1-based attempt number.
///
/// # Errors
///
/// Returns [`RetryError::Permanent`] for errors `is_retryable` rejects,
/// [`RetryError::Timeout`] once the budget is spent, and
/// [`RetryError::Expired`] when a success arrives after the deadline.
pub fn retry_with_budget<T, E, C, F, P>(
    clock: &C,
    policy: &RetryPolicy,
    operation: &str,
    is_retryable: P,
    mut attempt: F,
) -> Result<T, RetryError<E>>
where
    C: Clock + ?Sized,
    E: fmt::Display,
    F: FnMut(u32) -> Result<T, E>,
    P: Fn(&E) -> bool,
{
    let started = clock.now();
    let deadline = started.checked_add(policy.budget).unwrap_or(started);
    let mut backoff = policy.initial_backoff;
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        let outcome = attempt(attempts);
        if outcome.is_ok() && clock.now() > deadline {
            return Err(RetryError::Expired {
                attempts,
                waited: clock.now().saturating_duration_since(started),
            });
        }
        let err = match outcome {
            Ok(value) => return Ok(value),
            Err(err) if !is_retryable(&err) => return Err(RetryError::Permanent(err)),
            Err(err) => err,
        };
        let remaining = deadline.saturating_duration_since(clock.now());
        if remaining.is_zero() {
            return Err(RetryError::Timeout {
                attempts,
                waited: clock.now().saturating_duration_since(started),
                last: err,
            });
        }
        let delay = backoff.min(remaining);
        debug!(
            operation,
            attempt = attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "retrying after retryable failure"
        );
        clock.sleep(delay);
        backoff = policy.next_backoff(backoff);
        if clock.now() >= deadline {
            return Err(RetryError::Timeout {
                attempts,
                waited: clock.now().saturating_duration_since(started),
                last: err,
            });
        }
    }
}
