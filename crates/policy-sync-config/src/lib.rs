// crates/policy-sync-config/src/lib.rs
// ============================================================================
// Module: Policy Sync Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for policy-sync.toml semantics.
// Dependencies: policy-sync-core, policy-sync-http, serde, toml
// ============================================================================

//! ## Overview
//! `policy-sync-config` defines the configuration model for hosts embedding
//! the policy sync engine. It provides strict, fail-closed validation and
//! converts into the engine and HTTP client configurations.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
