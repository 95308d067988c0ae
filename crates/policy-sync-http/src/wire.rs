// crates/policy-sync-http/src/wire.rs
// ============================================================================
// Module: API Wire Shapes
// Description: JSON request and response bodies of the remote API.
// Purpose: Keep serde field naming out of the client logic.
// Dependencies: policy-sync-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Request bodies borrow from core records; response bodies are owned and
//! tolerate missing fields. Update masks are field masks rendered as a
//! comma-separated path list.

// ============================================================================
// SECTION: Imports
// ============================================================================

use policy_sync_core::ModifyRequest;
use policy_sync_core::PolicyRemoval;
use policy_sync_core::TargetKey;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Resolve
// ============================================================================

/// Body of `policies:resolve`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest<'a> {
    /// Schema filter (exact name or wildcard).
    pub policy_schema_filter: &'a str,
    /// Target to resolve against.
    pub policy_target_key: &'a TargetKey,
    /// Continuation token from the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<&'a str>,
}

/// Response page of `policies:resolve`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    /// Resolved policies on this page.
    #[serde(default)]
    pub resolved_policies: Vec<ResolvedPolicyWire>,
    /// Token for the next page, absent or empty on the last page.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// One resolved policy entry.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPolicyWire {
    /// Effective value.
    #[serde(default)]
    pub value: PolicyValueWire,
}

/// Policy value as carried by resolve responses.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyValueWire {
    /// Schema of the value.
    #[serde(default)]
    pub policy_schema: String,
    /// Field values.
    #[serde(default)]
    pub value: Map<String, Value>,
}

// ============================================================================
// SECTION: Batch Writes
// ============================================================================

/// Envelope shared by every batch call.
#[derive(Debug, Serialize)]
pub struct BatchRequest<T> {
    /// Individual requests.
    pub requests: Vec<T>,
}

/// One entry of a batch modify call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyEntry<'a> {
    /// Target of the modification.
    pub policy_target_key: &'a TargetKey,
    /// Value to set.
    pub policy_value: ModifyValue<'a>,
    /// Comma-separated field mask.
    pub update_mask: String,
}

/// Value block of a modify entry.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyValue<'a> {
    /// Schema being modified.
    pub policy_schema: &'a str,
    /// Field values.
    pub value: &'a Map<String, Value>,
}

impl<'a> From<&'a ModifyRequest> for ModifyEntry<'a> {
    fn from(request: &'a ModifyRequest) -> Self {
        Self {
            policy_target_key: &request.target_key,
            policy_value: ModifyValue {
                policy_schema: &request.policy_schema,
                value: &request.value,
            },
            update_mask: request.update_mask.join(","),
        }
    }
}

/// One entry of a batch delete or inherit call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalEntry<'a> {
    /// Target of the removal.
    pub policy_target_key: &'a TargetKey,
    /// Schema being removed.
    pub policy_schema: &'a str,
}

impl<'a> From<&'a PolicyRemoval> for RemovalEntry<'a> {
    fn from(removal: &'a PolicyRemoval) -> Self {
        Self {
            policy_target_key: &removal.target_key,
            policy_schema: &removal.policy_schema,
        }
    }
}

// ============================================================================
// SECTION: Group Priority Ordering
// ============================================================================

/// Body of the priority ordering update and list calls.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityOrderingRequest<'a> {
    /// Target the ordering applies to.
    pub policy_target_key: &'a TargetKey,
    /// Schema the ordering applies to.
    pub policy_schema: &'a str,
    /// Namespace of the schema.
    pub policy_namespace: &'a str,
    /// Group ids, highest priority first; omitted for list calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_ids: Option<&'a [String]>,
}

/// Response of the priority ordering list call.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityOrderingResponse {
    /// Group ids, highest priority first.
    #[serde(default)]
    pub group_ids: Vec<String>,
}

// ============================================================================
// SECTION: Policy Files
// ============================================================================

/// Metadata part of `policies/files:uploadPolicyFile`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPolicyFileRequest<'a> {
    /// Fully qualified policy field the file is uploaded for.
    pub policy_field: &'a str,
}

/// Response of `policies/files:uploadPolicyFile`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPolicyFileResponse {
    /// URI to reference the uploaded file from policy values.
    #[serde(default)]
    pub download_uri: String,
}

// ============================================================================
// SECTION: Directory
// ============================================================================

/// Minimal directory resource body; only the etag is consumed.
#[derive(Debug, Default, Deserialize)]
pub struct DirectoryResource {
    /// Entity tag of the resource.
    #[serde(default)]
    pub etag: String,
}

/// Error envelope returned by the remote APIs.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorEnvelope {
    /// Error details.
    #[serde(default)]
    pub error: ErrorBody,
}

/// Error details.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}
