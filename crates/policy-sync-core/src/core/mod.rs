// crates/policy-sync-core/src/core/mod.rs
// ============================================================================
// Module: Policy Sync Core Types
// Description: Domain records shared by planning, validation, and dispatch.
// Purpose: Group the schema, policy, file, and target models.
// Dependencies: crate::core::{file, policy, schema, target}
// ============================================================================

//! ## Overview
//! Core types are plain data: they perform no I/O and hold no shared state.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod file;
pub mod policy;
pub mod schema;
pub mod target;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use file::DEFAULT_CONTENT_TYPE;
pub use file::InvalidPolicyField;
pub use file::PolicyField;
pub use file::UploadedPolicyFile;
pub use file::content_sha256;
pub use file::content_type_for;
pub use policy::BatchOperation;
pub use policy::BatchUnit;
pub use policy::GroupPriorityOrdering;
pub use policy::InvalidOrderingId;
pub use policy::ModifyRequest;
pub use policy::PolicyAssignment;
pub use policy::PolicyRemoval;
pub use policy::ResolvedPolicy;
pub use policy::ValueEncodingError;
pub use policy::parse_ordering_id;
pub use schema::FieldDescriptor;
pub use schema::RawFieldDescriptor;
pub use schema::RawMessageType;
pub use schema::RawPolicySchema;
pub use schema::RawSchemaDefinition;
pub use schema::RawTargetKeyName;
pub use schema::SchemaDescriptor;
pub use schema::WireType;
pub use target::AdditionalKeyBinding;
pub use target::PolicyTarget;
pub use target::TargetKey;
pub use target::TargetKind;
pub use target::UnknownTargetKind;
pub use target::collapse_bindings;
pub use target::normalize_target_id;
