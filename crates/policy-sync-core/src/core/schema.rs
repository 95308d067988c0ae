// crates/policy-sync-core/src/core/schema.rs
// ============================================================================
// Module: Policy Schemas
// Description: Wire types, field descriptors, and schema descriptors.
// Purpose: Model remotely fetched policy schemas as explicit runtime data.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Policy schemas are fetched at runtime, so their field shapes are data, not
//! Rust types. [`WireType`] is the closed table of scalar and structural kinds
//! a field may declare; [`SchemaDescriptor`] is the flattened, validated view
//! built from the raw [`RawPolicySchema`] document returned by the remote API.
//!
//! Known limitation: nested message types are flattened by leaf field name,
//! so a later field with the same name overwrites an earlier one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Label marking a repeated field in raw schema documents.
const LABEL_REPEATED: &str = "LABEL_REPEATED";

/// Scalar or structural kind declared by a schema field.
///
/// # Invariants
/// - Every remote type name maps to exactly one variant; unknown names map to
///   [`WireType::Unrecognized`], which validates like a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireType {
    /// Boolean.
    Bool,
    /// Signed 32-bit integer (also `sint32`, `sfixed32`).
    Int32,
    /// Signed 64-bit integer (also `sint64`, `sfixed64`).
    Int64,
    /// Unsigned 32-bit integer (also `fixed32`).
    Uint32,
    /// Unsigned 64-bit integer (also `fixed64`).
    Uint64,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// UTF-8 string.
    String,
    /// Enum value, carried as its symbolic name.
    Enum,
    /// Nested message, carried as a JSON object.
    Message,
    /// Any type name outside the table.
    Unrecognized,
}

impl WireType {
    /// Maps a remote type name (for example `TYPE_INT64`) to a wire type.
    #[must_use]
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "TYPE_BOOL" => Self::Bool,
            "TYPE_INT32" | "TYPE_SINT32" | "TYPE_SFIXED32" => Self::Int32,
            "TYPE_INT64" | "TYPE_SINT64" | "TYPE_SFIXED64" => Self::Int64,
            "TYPE_UINT32" | "TYPE_FIXED32" => Self::Uint32,
            "TYPE_UINT64" | "TYPE_FIXED64" => Self::Uint64,
            "TYPE_FLOAT" => Self::Float,
            "TYPE_DOUBLE" => Self::Double,
            "TYPE_STRING" => Self::String,
            "TYPE_ENUM" => Self::Enum,
            "TYPE_MESSAGE" => Self::Message,
            _ => Self::Unrecognized,
        }
    }

    /// Returns a stable label for error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Enum => "enum",
            Self::Message => "message",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// Returns true for the integer family.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int32 | Self::Int64 | Self::Uint32 | Self::Uint64)
    }

    /// Returns true for the floating-point family.
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Descriptor for a single schema field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Leaf field name.
    pub name: String,
    /// Declared wire type.
    pub wire_type: WireType,
    /// True when the field carries a list of values.
    pub repeated: bool,
}

/// Flattened policy schema descriptor.
///
/// # Invariants
/// - Field names are unique; collisions during flattening keep the last field.
/// - An empty `additional_target_key_names` means no additional keys are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Fully qualified schema name (for example `chrome.users.MaxConnectionsPerProxy`).
    pub name: String,
    /// Fields keyed by leaf name.
    pub fields: BTreeMap<String, FieldDescriptor>,
    /// Additional target key names the schema accepts.
    pub additional_target_key_names: BTreeSet<String>,
}

impl SchemaDescriptor {
    /// Builds a descriptor from a raw schema document.
    ///
    /// Returns `None` when the document has no definition or no message types.
    #[must_use]
    pub fn from_raw(name: &str, raw: &RawPolicySchema) -> Option<Self> {
        let definition = raw.definition.as_ref()?;
        if definition.message_type.is_empty() {
            return None;
        }
        let mut fields = BTreeMap::new();
        for message in &definition.message_type {
            for field in &message.field {
                fields.insert(
                    field.name.clone(),
                    FieldDescriptor {
                        name: field.name.clone(),
                        wire_type: WireType::from_type_name(&field.field_type),
                        repeated: field.label == LABEL_REPEATED,
                    },
                );
            }
        }
        let additional_target_key_names =
            raw.additional_target_key_names.iter().map(|entry| entry.key.clone()).collect();
        let name = if raw.schema_name.is_empty() { name } else { raw.schema_name.as_str() };
        Some(Self {
            name: name.to_string(),
            fields,
            additional_target_key_names,
        })
    }

    /// Returns the descriptor for a field, if declared.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Returns true when the schema declares additional target keys.
    #[must_use]
    pub fn requires_additional_keys(&self) -> bool {
        !self.additional_target_key_names.is_empty()
    }
}

// ============================================================================
// SECTION: Raw Schema Documents
// ============================================================================

/// Raw policy schema document as returned by the remote API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPolicySchema {
    /// Resource name of the schema.
    #[serde(default)]
    pub name: String,
    /// Fully qualified schema name.
    #[serde(default)]
    pub schema_name: String,
    /// File descriptor carrying the message types.
    #[serde(default)]
    pub definition: Option<RawSchemaDefinition>,
    /// Declared additional target key names.
    #[serde(default)]
    pub additional_target_key_names: Vec<RawTargetKeyName>,
}

/// File-level schema definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSchemaDefinition {
    /// Message types declared by the schema.
    #[serde(default)]
    pub message_type: Vec<RawMessageType>,
}

/// One message type within a schema definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessageType {
    /// Message type name.
    #[serde(default)]
    pub name: String,
    /// Fields declared by the message.
    #[serde(default)]
    pub field: Vec<RawFieldDescriptor>,
}

/// One raw field descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFieldDescriptor {
    /// Field name.
    #[serde(default)]
    pub name: String,
    /// Label (`LABEL_OPTIONAL`, `LABEL_REPEATED`, ...).
    #[serde(default)]
    pub label: String,
    /// Type name (`TYPE_BOOL`, `TYPE_INT64`, ...).
    #[serde(rename = "type", default)]
    pub field_type: String,
    /// Referenced type for message and enum fields.
    #[serde(default)]
    pub type_name: Option<String>,
}

/// Declared additional target key name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTargetKeyName {
    /// Key name (for example `app_id`).
    pub key: String,
    /// Human-readable description.
    #[serde(default)]
    pub key_description: String,
}
