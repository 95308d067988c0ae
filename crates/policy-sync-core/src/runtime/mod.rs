// crates/policy-sync-core/src/runtime/mod.rs
// ============================================================================
// Module: Policy Sync Runtime
// Description: Engine, planner, codec, catalog, poller, and retry helpers.
// Purpose: Execute policy sync operations against remote collaborators.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement validation, batch planning, dispatch, read-back,
//! and consistency polling. Every operation runs through [`PolicyEngine`] so
//! retry and validation ordering stay uniform.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod catalog;
pub mod clock;
pub mod codec;
pub mod engine;
pub mod error;
pub mod planner;
pub mod poller;
pub mod retry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::SchemaCatalog;
pub use clock::SystemClock;
pub use codec::ConversionError;
pub use codec::ValidationError;
pub use engine::DEFAULT_CONSISTENCY_TIMEOUT;
pub use engine::DEFAULT_POLL_INTERVAL;
pub use engine::EngineConfig;
pub use engine::PolicyEngine;
pub use error::PolicyError;
pub use planner::PlanIntent;
pub use planner::TargetBatchPlanner;
pub use poller::ConsistencyPoller;
pub use poller::ConsistencyReport;
pub use poller::ConsistencyToken;
pub use poller::PollerState;
pub use retry::DEFAULT_BACKOFF_MULTIPLIER;
pub use retry::DEFAULT_INITIAL_BACKOFF;
pub use retry::DEFAULT_MAX_BACKOFF;
pub use retry::DEFAULT_RETRY_BUDGET;
pub use retry::RetryError;
pub use retry::RetryPolicy;
pub use retry::retry_with_budget;
