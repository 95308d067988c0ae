// crates/policy-sync-core/src/lib.rs
// ============================================================================
// Module: Policy Sync Core Library
// Description: Public API surface for the policy sync core.
// Purpose: Expose core types, collaborator interfaces, and the runtime engine.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Policy sync core validates browser management policies against schemas
//! fetched at runtime, batches them per target the way the remote API
//! requires, dispatches them with bounded retries, reads them back as typed
//! values, and waits for eventually consistent directory resources to settle.
//! It is transport-agnostic: remote access goes through the traits in
//! [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ApiError;
pub use interfaces::Clock;
pub use interfaces::ConditionalRead;
pub use interfaces::PolicyDispatcher;
pub use interfaces::PolicyFileUploader;
pub use interfaces::PolicyResolver;
pub use interfaces::PriorityOrderingApi;
pub use interfaces::ResourceKind;
pub use interfaces::ResourceReader;
pub use interfaces::SchemaSource;
pub use runtime::ConsistencyPoller;
pub use runtime::ConsistencyReport;
pub use runtime::ConsistencyToken;
pub use runtime::ConversionError;
pub use runtime::DEFAULT_BACKOFF_MULTIPLIER;
pub use runtime::DEFAULT_CONSISTENCY_TIMEOUT;
pub use runtime::DEFAULT_INITIAL_BACKOFF;
pub use runtime::DEFAULT_MAX_BACKOFF;
pub use runtime::DEFAULT_POLL_INTERVAL;
pub use runtime::DEFAULT_RETRY_BUDGET;
pub use runtime::EngineConfig;
pub use runtime::PlanIntent;
pub use runtime::PolicyEngine;
pub use runtime::PolicyError;
pub use runtime::PollerState;
pub use runtime::RetryError;
pub use runtime::RetryPolicy;
pub use runtime::SchemaCatalog;
pub use runtime::SystemClock;
pub use runtime::TargetBatchPlanner;
pub use runtime::ValidationError;
pub use runtime::codec;
pub use runtime::retry_with_budget;
