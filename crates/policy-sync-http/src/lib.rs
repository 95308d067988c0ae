// crates/policy-sync-http/src/lib.rs
// ============================================================================
// Module: Policy Sync HTTP Library
// Description: REST adapter for the policy sync core collaborator traits.
// Purpose: Expose the blocking API client, its configuration, and token sources.
// Dependencies: crate::{auth, client, config, wire}
// ============================================================================

//! ## Overview
//! Policy sync HTTP implements every collaborator trait of `policy-sync-core`
//! against the browser policy and directory REST APIs. The client performs a
//! single attempt per call; retry budgets and consistency polling stay in the
//! core engine.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod client;
pub mod config;
pub mod wire;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auth::StaticToken;
pub use auth::TokenSource;
pub use client::ChromePolicyClient;
pub use client::classify_status;
pub use config::ClientConfigError;
pub use config::DEFAULT_CHROME_POLICY_BASE;
pub use config::DEFAULT_CUSTOMER_ID;
pub use config::DEFAULT_DIRECTORY_BASE;
pub use config::DEFAULT_MAX_RESPONSE_BYTES;
pub use config::DEFAULT_TIMEOUT_MS;
pub use config::HttpClientConfig;
pub use config::validate_base_url;
