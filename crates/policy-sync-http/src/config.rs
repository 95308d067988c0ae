// crates/policy-sync-http/src/config.rs
// ============================================================================
// Module: HTTP Client Configuration
// Description: Endpoints, limits, and transport policy for the API client.
// Purpose: Keep outbound requests bounded and scheme-restricted.
// Dependencies: reqwest, serde, thiserror
// ============================================================================

//! ## Overview
//! [`HttpClientConfig`] names the two API hosts the client talks to and the
//! limits applied to every request. Base URLs must use `https` unless
//! `allow_http` is set, which exists for loopback test servers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use reqwest::Url;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Customer alias resolving to the caller's own account.
pub const DEFAULT_CUSTOMER_ID: &str = "my_customer";
/// Default browser policy API host.
pub const DEFAULT_CHROME_POLICY_BASE: &str = "https://chromepolicy.googleapis.com";
/// Default directory API host.
pub const DEFAULT_DIRECTORY_BASE: &str = "https://admin.googleapis.com";
/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default response size cap in bytes.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for [`crate::ChromePolicyClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// Customer identifier used in resource paths.
    pub customer_id: String,
    /// Base URL of the browser policy API.
    pub chrome_policy_base: String,
    /// Base URL of the directory API.
    pub directory_base: String,
    /// Allow cleartext HTTP (disabled by default).
    pub allow_http: bool,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    pub max_response_bytes: usize,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            customer_id: DEFAULT_CUSTOMER_ID.to_string(),
            chrome_policy_base: DEFAULT_CHROME_POLICY_BASE.to_string(),
            directory_base: DEFAULT_DIRECTORY_BASE.to_string(),
            allow_http: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            user_agent: concat!("policy-sync/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Errors raised while building the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientConfigError {
    /// Base URL failed to parse.
    #[error("invalid base url {url}: {message}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parser message.
        message: String,
    },
    /// Base URL uses a scheme the configuration does not permit.
    #[error("unsupported url scheme for {0}")]
    UnsupportedScheme(String),
    /// Base URL cannot carry path segments.
    #[error("base url cannot be a base: {0}")]
    NotABase(String),
    /// Customer identifier is empty.
    #[error("customer id must not be empty")]
    EmptyCustomer,
    /// Underlying HTTP client failed to build.
    #[error("http client build failed: {0}")]
    Build(String),
}

/// Parses and validates a base URL against the scheme policy.
///
/// # Errors
///
/// Returns [`ClientConfigError`] when the URL is malformed, uses a disallowed
/// scheme, or cannot carry path segments.
pub fn validate_base_url(raw: &str, allow_http: bool) -> Result<Url, ClientConfigError> {
    let url = Url::parse(raw).map_err(|err| ClientConfigError::InvalidUrl {
        url: raw.to_string(),
        message: err.to_string(),
    })?;
    match url.scheme() {
        "https" => {}
        "http" if allow_http => {}
        _ => return Err(ClientConfigError::UnsupportedScheme(raw.to_string())),
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ClientConfigError::NotABase(raw.to_string()));
    }
    Ok(url)
}
