// crates/policy-sync-core/src/runtime/error.rs
// ============================================================================
// Module: Policy Sync Errors
// Description: Error taxonomy surfaced by engine operations.
// Purpose: Give callers one error type with stable, matchable variants.
// Dependencies: crate::interfaces, crate::runtime::{codec, retry}, thiserror
// ============================================================================

//! ## Overview
//! [`PolicyError`] is returned by every engine operation. Remote failures are
//! wrapped with the operation label that produced them so logs and messages
//! read without extra context.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use thiserror::Error;

use crate::core::InvalidOrderingId;
use crate::core::InvalidPolicyField;
use crate::core::UnknownTargetKind;
use crate::interfaces::ApiError;
use crate::runtime::codec::ConversionError;
use crate::runtime::codec::ValidationError;
use crate::runtime::retry::RetryError;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by policy sync operations.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - [`PolicyError::DispatchFailed`] is only returned after at least one unit
///   was planned.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Schema does not exist or has no message types.
    #[error("policy schema not found: {schema}")]
    SchemaNotFound {
        /// Requested schema name.
        schema: String,
    },
    /// Caller values failed schema validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Resolved values could not be converted.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    /// Caller input was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Remote call failed with a non-retryable error.
    #[error("{operation} failed: {source}")]
    Api {
        /// Operation label.
        operation: String,
        /// Classified remote failure.
        source: ApiError,
    },
    /// Retry budget elapsed while the last error was still retryable.
    #[error("{operation} timed out after {attempts} attempts in {}ms: {last}", .waited.as_millis())]
    Timeout {
        /// Operation label.
        operation: String,
        /// Attempts issued.
        attempts: u32,
        /// Time spent retrying.
        waited: Duration,
        /// Last retryable failure.
        #[source]
        last: ApiError,
    },
    /// Deadline passed while the last attempt was in flight.
    #[error("{operation} exceeded its deadline during attempt {attempts} after {}ms", .waited.as_millis())]
    DeadlineExceeded {
        /// Operation label.
        operation: String,
        /// Attempts issued.
        attempts: u32,
        /// Time elapsed since the first attempt.
        waited: Duration,
    },
    /// Resource never reached the required number of stable observations.
    #[error(
        "{resource} not consistent after {}ms ({stable} of {required} stable observations)",
        .waited.as_millis()
    )]
    ConsistencyTimeout {
        /// Resource label (`group/<id>` or `orgunit/<id>`).
        resource: String,
        /// Time spent polling.
        waited: Duration,
        /// Consecutive stable observations reached.
        stable: u32,
        /// Stable observations required.
        required: u32,
    },
    /// A batch unit failed after earlier units were applied.
    #[error(
        "dispatch failed after {succeeded} of {planned} batch units ({skipped} skipped): {source}"
    )]
    DispatchFailed {
        /// Units applied before the failure.
        succeeded: usize,
        /// Units skipped before the failure because their apps were not installed.
        skipped: usize,
        /// Units planned for the operation.
        planned: usize,
        /// Failure of the unit that stopped dispatch.
        source: Box<Self>,
    },
}

impl PolicyError {
    /// Wraps a terminal retry outcome with its operation label.
    #[must_use]
    pub fn from_retry(operation: &str, err: RetryError<ApiError>) -> Self {
        match err {
            RetryError::Permanent(source) => Self::Api {
                operation: operation.to_string(),
                source,
            },
            RetryError::Timeout {
                attempts,
                waited,
                last,
            } => Self::Timeout {
                operation: operation.to_string(),
                attempts,
                waited,
                last,
            },
            RetryError::Expired {
                attempts,
                waited,
            } => Self::DeadlineExceeded {
                operation: operation.to_string(),
                attempts,
                waited,
            },
        }
    }

    /// Returns the remote failure behind the error, if any.
    #[must_use]
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api {
                source, ..
            } => Some(source),
            Self::Timeout {
                last, ..
            } => Some(last),
            Self::DispatchFailed {
                source, ..
            } => source.api_error(),
            _ => None,
        }
    }
}

impl From<UnknownTargetKind> for PolicyError {
    fn from(err: UnknownTargetKind) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<InvalidOrderingId> for PolicyError {
    fn from(err: InvalidOrderingId) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<InvalidPolicyField> for PolicyError {
    fn from(err: InvalidPolicyField) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}
