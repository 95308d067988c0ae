// crates/policy-sync-core/src/interfaces/mod.rs
// ============================================================================
// Module: Policy Sync Interfaces
// Description: Collaborator contracts for schemas, writes, uploads, and reads.
// Purpose: Define the narrow seams the core consumes from the remote API.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the core talks to the remote management API without
//! embedding transport details. Implementations classify failures into
//! [`ApiError`] so retry decisions stay in the core. Time is consumed through
//! [`Clock`] so hosts and tests control waiting.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;
use std::time::Instant;

use thiserror::Error;

use crate::core::GroupPriorityOrdering;
use crate::core::ModifyRequest;
use crate::core::PolicyRemoval;
use crate::core::RawPolicySchema;
use crate::core::ResolvedPolicy;
use crate::core::TargetKey;
use crate::core::TargetKind;

// ============================================================================
// SECTION: API Errors
// ============================================================================

/// Message fragment the remote API uses when deleting policies for apps that are gone.
const APPS_NOT_INSTALLED: &str = "apps are not installed";

/// Classified failure reported by a remote API collaborator.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - [`ApiError::is_transient`] is the single retry classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Remote resource does not exist (HTTP 404).
    #[error("remote resource not found: {0}")]
    NotFound(String),
    /// Remote API throttled the request (HTTP 429).
    #[error("remote api rate limited: {0}")]
    RateLimited(String),
    /// Remote API failed server-side (HTTP 5xx).
    #[error("remote api unavailable: {0}")]
    Unavailable(String),
    /// Request never produced a response.
    #[error("remote api transport failure: {0}")]
    Transport(String),
    /// Remote API rejected the request.
    #[error("remote api rejected request (status {status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error message returned by the API.
        message: String,
    },
    /// Response could not be decoded or exceeded limits.
    #[error("remote api response malformed: {0}")]
    Malformed(String),
    /// Credentials could not be obtained.
    #[error("remote api credentials unavailable: {0}")]
    Credentials(String),
}

impl ApiError {
    /// Returns true for network, throttling, and server-side failures.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Unavailable(_) | Self::Transport(_))
    }

    /// Returns true when the remote resource was not found.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true for the rejection the API emits when deleting policies of
    /// applications no longer installed in the domain.
    #[must_use]
    pub fn is_app_not_installed(&self) -> bool {
        matches!(self, Self::Rejected { status: 400, message } if message.contains(APPS_NOT_INSTALLED))
    }
}

// ============================================================================
// SECTION: Schema Source
// ============================================================================

/// Source of raw policy schema documents.
pub trait SchemaSource {
    /// Fetches the raw schema document for a fully qualified schema name.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the schema cannot be fetched.
    fn get_schema(&self, schema_name: &str) -> Result<RawPolicySchema, ApiError>;
}

// ============================================================================
// SECTION: Policy Resolver
// ============================================================================

/// Reads the effective policy values for a target.
pub trait PolicyResolver {
    /// Resolves policies matching `schema_filter` for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the resolve call fails.
    fn resolve(
        &self,
        target: &TargetKey,
        schema_filter: &str,
    ) -> Result<Vec<ResolvedPolicy>, ApiError>;
}

// ============================================================================
// SECTION: Policy Dispatcher
// ============================================================================

/// Batch write primitives scoped by target kind.
pub trait PolicyDispatcher {
    /// Applies modify requests in one call against the kind's endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the call fails.
    fn batch_modify(&self, kind: TargetKind, requests: &[ModifyRequest]) -> Result<(), ApiError>;

    /// Deletes group policies in one call.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the call fails.
    fn batch_delete(&self, removals: &[PolicyRemoval]) -> Result<(), ApiError>;

    /// Resets org unit policies to their inherited values in one call.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the call fails.
    fn batch_inherit(&self, removals: &[PolicyRemoval]) -> Result<(), ApiError>;
}

// ============================================================================
// SECTION: Priority Ordering
// ============================================================================

/// Group priority ordering primitives.
pub trait PriorityOrderingApi {
    /// Replaces the group priority ordering for a schema under a target.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the call fails.
    fn update_group_priority_ordering(
        &self,
        ordering: &GroupPriorityOrdering,
    ) -> Result<(), ApiError>;

    /// Lists the group priority ordering for a schema under a target.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the call fails.
    fn list_group_priority_ordering(
        &self,
        target: &TargetKey,
        policy_schema: &str,
        policy_namespace: &str,
    ) -> Result<Vec<String>, ApiError>;
}

// ============================================================================
// SECTION: Policy Files
// ============================================================================

/// Upload primitive for files referenced by policy values.
pub trait PolicyFileUploader {
    /// Uploads `content` for the fully qualified `policy_field`.
    ///
    /// Returns the download URI assigned by the API.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the upload fails or the response carries no
    /// download URI.
    fn upload_policy_file(
        &self,
        policy_field: &str,
        content_type: &str,
        content: &[u8],
    ) -> Result<String, ApiError>;
}

// ============================================================================
// SECTION: Conditional Reads
// ============================================================================

/// Resource whose etag is polled for consistency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Directory group.
    Group,
    /// Organizational unit.
    OrgUnit,
}

impl ResourceKind {
    /// Returns a stable label for logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::OrgUnit => "orgunit",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TargetKind> for ResourceKind {
    fn from(kind: TargetKind) -> Self {
        match kind {
            TargetKind::OrgUnit => Self::OrgUnit,
            TargetKind::Group => Self::Group,
        }
    }
}

/// Outcome of a conditional ("if none match") read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionalRead {
    /// Etag unchanged since the supplied value.
    NotModified,
    /// Resource not visible.
    NotFound,
    /// Resource returned with the given etag.
    Modified {
        /// Current etag of the resource.
        etag: String,
    },
}

/// Conditional reader for etag-bearing resources.
pub trait ResourceReader {
    /// Reads `resource_id`, reporting not-modified when its etag equals `etag`.
    ///
    /// An empty `etag` reads unconditionally.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] for failures other than not-modified and not-found.
    fn get_if_none_match(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        etag: &str,
    ) -> Result<ConditionalRead, ApiError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Time source used for deadlines and backoff.
pub trait Clock {
    /// Returns the current instant.
    fn now(&self) -> Instant;

    /// Blocks the caller for `duration`.
    fn sleep(&self, duration: Duration);
}
