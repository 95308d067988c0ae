// crates/policy-sync-http/src/auth.rs
// ============================================================================
// Module: Access Tokens
// Description: Bearer token sources for outbound requests.
// Purpose: Decouple credential acquisition from the HTTP client.
// Dependencies: policy-sync-core
// ============================================================================

//! ## Overview
//! The client asks its [`TokenSource`] for a bearer token before every
//! request, so sources that refresh tokens can do so transparently.
//! Credential acquisition flows (service accounts, impersonation) live with
//! the host and plug in through this trait.

use std::fmt;

use policy_sync_core::ApiError;

/// Supplier of OAuth bearer tokens.
pub trait TokenSource {
    /// Returns the token to send with the next request.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Credentials`] when no token can be produced.
    fn access_token(&self) -> Result<String, ApiError>;
}

/// Fixed bearer token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wraps a token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

impl TokenSource for StaticToken {
    fn access_token(&self) -> Result<String, ApiError> {
        if self.0.is_empty() {
            return Err(ApiError::Credentials("access token is empty".to_string()));
        }
        Ok(self.0.clone())
    }
}
