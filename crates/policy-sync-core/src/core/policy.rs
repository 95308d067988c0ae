// crates/policy-sync-core/src/core/policy.rs
// ============================================================================
// Module: Policy Records
// Description: Policy assignments, batch units, and dispatch request shapes.
// Purpose: Carry caller input through planning and dispatch.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`PolicyAssignment`] pairs a schema name with decoded field values. The
//! planner groups assignments into [`BatchUnit`] values, and the engine turns
//! each unit into [`ModifyRequest`] or [`PolicyRemoval`] records for the
//! dispatcher. Priority orderings are carried as [`GroupPriorityOrdering`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::target::TargetKey;

// ============================================================================
// SECTION: Policy Assignment
// ============================================================================

/// Error raised when a declared field value is not valid JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("value for field {field} in schema {schema} is not valid json: {message}")]
pub struct ValueEncodingError {
    /// Schema name.
    pub schema: String,
    /// Field name.
    pub field: String,
    /// Decoder message.
    pub message: String,
}

/// Policy values to apply for one schema.
///
/// # Invariants
/// - `values` holds decoded JSON values keyed by schema field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyAssignment {
    /// Fully qualified schema name.
    pub schema_name: String,
    /// Decoded field values.
    pub values: BTreeMap<String, Value>,
}

impl PolicyAssignment {
    /// Creates an assignment from already decoded values.
    #[must_use]
    pub fn new(schema_name: impl Into<String>, values: BTreeMap<String, Value>) -> Self {
        Self {
            schema_name: schema_name.into(),
            values,
        }
    }

    /// Creates an assignment that carries only a schema name.
    ///
    /// Removal planning needs nothing else.
    #[must_use]
    pub fn schema_only(schema_name: impl Into<String>) -> Self {
        Self::new(schema_name, BTreeMap::new())
    }

    /// Decodes JSON-encoded field values declared by a caller.
    ///
    /// # Errors
    ///
    /// Returns [`ValueEncodingError`] for the first value that is not valid JSON.
    pub fn decode(
        schema_name: impl Into<String>,
        encoded: &BTreeMap<String, String>,
    ) -> Result<Self, ValueEncodingError> {
        let schema_name = schema_name.into();
        let mut values = BTreeMap::new();
        for (field, raw) in encoded {
            let value = serde_json::from_str::<Value>(raw).map_err(|err| ValueEncodingError {
                schema: schema_name.clone(),
                field: field.clone(),
                message: err.to_string(),
            })?;
            values.insert(field.clone(), value);
        }
        Ok(Self {
            schema_name,
            values,
        })
    }

    /// Re-encodes the values as JSON strings, the caller-facing form.
    #[must_use]
    pub fn encode(&self) -> BTreeMap<String, String> {
        self.values.iter().map(|(field, value)| (field.clone(), value.to_string())).collect()
    }

    /// Returns the field names present in the assignment, sorted.
    #[must_use]
    pub fn update_mask(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }
}

// ============================================================================
// SECTION: Batch Units
// ============================================================================

/// Operation carried by a batch unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOperation {
    /// Set the assignment values.
    Modify,
    /// Remove the policy from a group target.
    Delete,
    /// Reset an org unit policy to the parent's value.
    Inherit,
}

impl BatchOperation {
    /// Returns a stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Modify => "modify",
            Self::Delete => "delete",
            Self::Inherit => "inherit",
        }
    }
}

/// One network call worth of policy operations against a single target.
///
/// # Invariants
/// - `assignments` is non-empty and keeps caller order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUnit {
    /// Fully qualified target of every assignment in the unit.
    pub target_key: TargetKey,
    /// Assignments bundled into the call.
    pub assignments: Vec<PolicyAssignment>,
    /// Operation applied to every assignment.
    pub operation: BatchOperation,
}

impl BatchUnit {
    /// Builds modify requests for every assignment in the unit.
    #[must_use]
    pub fn modify_requests(&self) -> Vec<ModifyRequest> {
        self.assignments
            .iter()
            .map(|assignment| ModifyRequest {
                target_key: self.target_key.clone(),
                policy_schema: assignment.schema_name.clone(),
                value: assignment.values.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                update_mask: assignment.update_mask(),
            })
            .collect()
    }

    /// Builds removal requests for every assignment in the unit.
    #[must_use]
    pub fn removals(&self) -> Vec<PolicyRemoval> {
        self.assignments
            .iter()
            .map(|assignment| PolicyRemoval {
                target_key: self.target_key.clone(),
                policy_schema: assignment.schema_name.clone(),
            })
            .collect()
    }

    /// Returns the schema names carried by the unit.
    #[must_use]
    pub fn schema_names(&self) -> Vec<&str> {
        self.assignments.iter().map(|assignment| assignment.schema_name.as_str()).collect()
    }
}

// ============================================================================
// SECTION: Dispatch Requests
// ============================================================================

/// Request to set one policy's values on a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyRequest {
    /// Target of the modification.
    pub target_key: TargetKey,
    /// Schema being modified.
    pub policy_schema: String,
    /// Field values to set.
    pub value: Map<String, Value>,
    /// Field names covered by the request, sorted.
    pub update_mask: Vec<String>,
}

/// Request to remove (group) or inherit (org unit) one policy on a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRemoval {
    /// Target of the removal.
    pub target_key: TargetKey,
    /// Schema being removed.
    pub policy_schema: String,
}

/// Policy value resolved by the remote API for a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPolicy {
    /// Schema of the resolved value.
    pub policy_schema: String,
    /// Raw field values as serialized by the remote API.
    pub value: Map<String, Value>,
}

// ============================================================================
// SECTION: Group Priority Ordering
// ============================================================================

/// Error raised when a priority ordering identifier cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid priority ordering id {0}: expected 'policySchema:targetResource'")]
pub struct InvalidOrderingId(pub String);

/// Ordered list of groups whose policies win for a schema under a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPriorityOrdering {
    /// Target the ordering applies to.
    pub target_key: TargetKey,
    /// Schema the ordering applies to.
    pub policy_schema: String,
    /// Policy namespace of the schema (for example `chrome.users.apps`).
    pub policy_namespace: String,
    /// Group identifiers, highest priority first.
    pub group_ids: Vec<String>,
}

impl GroupPriorityOrdering {
    /// Returns the external identifier `"<policySchema>:<targetResource>"`.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}:{}", self.policy_schema, self.target_key.target_resource)
    }
}

/// Splits a priority ordering identifier into schema and target resource.
///
/// # Errors
///
/// Returns [`InvalidOrderingId`] when either half is missing.
pub fn parse_ordering_id(id: &str) -> Result<(String, String), InvalidOrderingId> {
    match id.split_once(':') {
        Some((schema, target)) if !schema.is_empty() && !target.is_empty() => {
            Ok((schema.to_string(), target.to_string()))
        }
        _ => Err(InvalidOrderingId(id.to_string())),
    }
}
