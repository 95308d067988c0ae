// crates/policy-sync-core/src/runtime/poller.rs
// ============================================================================
// Module: Consistency Poller
// Description: Etag-based stability polling for eventually consistent reads.
// Purpose: Wait until a directory resource stops changing before proceeding.
// Dependencies: crate::interfaces, crate::runtime::error, tracing
// ============================================================================

//! ## Overview
//! Writes to the remote directory become visible gradually. The poller issues
//! conditional reads against a resource and counts consecutive "not modified"
//! answers since the last etag change. Once the count reaches the required
//! threshold the resource is treated as converged.
//!
//! Transitions per read:
//! - not modified: stable count grows by one.
//! - new etag: becomes the baseline; stable count resets to zero.
//! - not found: stable count resets; the baseline etag is kept, so a
//!   recreated resource shows up as a new etag.
//! - other failure: logged; the state is unchanged and polling continues.
//!
//! Convergence is checked before the deadline, so a resource that converges
//! on the last tick is reported as converged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;
use std::time::Instant;

use tracing::debug;
use tracing::warn;

use crate::interfaces::Clock;
use crate::interfaces::ConditionalRead;
use crate::interfaces::ResourceKind;
use crate::interfaces::ResourceReader;
use crate::runtime::error::PolicyError;

// ============================================================================
// SECTION: Token
// ============================================================================

/// Observable state of a consistency wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Still polling.
    Waiting,
    /// Required stable observations reached.
    Converged,
    /// Deadline reached without convergence.
    TimedOut,
}

/// Progress of a consistency wait for one resource.
///
/// # Invariants
/// - `stable_count` counts consecutive not-modified reads since `last_etag` was set.
/// - An empty `last_etag` means no baseline has been observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyToken {
    /// Kind of the polled resource.
    pub resource_kind: ResourceKind,
    /// Identifier of the polled resource.
    pub resource_id: String,
    /// Baseline etag.
    pub last_etag: String,
    /// Consecutive stable observations.
    pub stable_count: u32,
    /// Stable observations required to converge.
    pub required_stable_count: u32,
    /// Instant after which polling stops.
    pub deadline: Instant,
}

impl ConsistencyToken {
    /// Creates a token with no baseline.
    #[must_use]
    pub fn new(
        resource_kind: ResourceKind,
        resource_id: impl Into<String>,
        required_stable_count: u32,
        deadline: Instant,
    ) -> Self {
        Self {
            resource_kind,
            resource_id: resource_id.into(),
            last_etag: String::new(),
            stable_count: 0,
            required_stable_count,
            deadline,
        }
    }

    /// Applies one conditional read outcome.
    pub fn observe(&mut self, read: &ConditionalRead) {
        match read {
            ConditionalRead::NotModified => {
                self.stable_count = self.stable_count.saturating_add(1);
            }
            ConditionalRead::NotFound => {
                self.stable_count = 0;
            }
            ConditionalRead::Modified {
                etag,
            } => {
                if *etag != self.last_etag {
                    self.last_etag.clone_from(etag);
                    self.stable_count = 0;
                }
            }
        }
    }

    /// Returns true once enough stable observations were recorded.
    #[must_use]
    pub const fn is_converged(&self) -> bool {
        self.stable_count >= self.required_stable_count
    }

    /// Returns the state at `now`; convergence takes precedence over the deadline.
    #[must_use]
    pub fn state(&self, now: Instant) -> PollerState {
        if self.is_converged() {
            PollerState::Converged
        } else if now >= self.deadline {
            PollerState::TimedOut
        } else {
            PollerState::Waiting
        }
    }

    /// Returns `"<kind>/<id>"` for logs and errors.
    #[must_use]
    pub fn resource_label(&self) -> String {
        format!("{}/{}", self.resource_kind, self.resource_id)
    }
}

// ============================================================================
// SECTION: Poller
// ============================================================================

/// Summary of a converged wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Reads issued.
    pub reads: u32,
    /// Time spent polling.
    pub waited: Duration,
}

/// Drives a [`ConsistencyToken`] against a [`ResourceReader`].
pub struct ConsistencyPoller<'a, R: ?Sized, C: ?Sized> {
    /// Conditional reader for the polled resource.
    reader: &'a R,
    /// Clock driving the schedule.
    clock: &'a C,
    /// Delay between reads.
    poll_interval: Duration,
}

impl<'a, R, C> ConsistencyPoller<'a, R, C>
where
    R: ResourceReader + ?Sized,
    C: Clock + ?Sized,
{
    /// Creates a poller reading every `poll_interval`.
    #[must_use]
    pub const fn new(reader: &'a R, clock: &'a C, poll_interval: Duration) -> Self {
        Self {
            reader,
            clock,
            poll_interval,
        }
    }

    /// Polls until `required_stable_count` consecutive stable reads or `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ConsistencyTimeout`] when the deadline passes first.
    pub fn wait(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        required_stable_count: u32,
        timeout: Duration,
    ) -> Result<ConsistencyReport, PolicyError> {
        let started = self.clock.now();
        let deadline = started.checked_add(timeout).unwrap_or(started);
        let mut token = ConsistencyToken::new(kind, resource_id, required_stable_count, deadline);
        let mut reads: u32 = 0;
        loop {
            let now = self.clock.now();
            match token.state(now) {
                PollerState::Converged => {
                    let waited = now.saturating_duration_since(started);
                    debug!(
                        resource = token.resource_label(),
                        reads,
                        waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                        "resource converged"
                    );
                    return Ok(ConsistencyReport {
                        reads,
                        waited,
                    });
                }
                PollerState::TimedOut => {
                    return Err(PolicyError::ConsistencyTimeout {
                        resource: token.resource_label(),
                        waited: now.saturating_duration_since(started),
                        stable: token.stable_count,
                        required: token.required_stable_count,
                    });
                }
                PollerState::Waiting => {}
            }
            if reads > 0 {
                self.clock.sleep(self.poll_interval.min(deadline.saturating_duration_since(now)));
                if token.state(self.clock.now()) == PollerState::TimedOut {
                    continue;
                }
            }
            reads = reads.saturating_add(1);
            match self.reader.get_if_none_match(kind, resource_id, &token.last_etag) {
                Ok(read) => token.observe(&read),
                Err(err) => warn!(
                    resource = token.resource_label(),
                    error = %err,
                    "conditional read failed; continuing to poll"
                ),
            }
        }
    }
}
