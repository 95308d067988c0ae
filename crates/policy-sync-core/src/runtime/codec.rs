// crates/policy-sync-core/src/runtime/codec.rs
// ============================================================================
// Module: Policy Value Codec
// Description: Validation of caller values and conversion of resolved values.
// Purpose: Check values against schema wire types and parse API strings back.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Validation runs before any write: every field an assignment names must be
//! declared by the schema and its decoded JSON value must be compatible with
//! the declared [`WireType`]. Conversion runs after a read: the remote API
//! serializes every scalar as a string, so [`convert`] parses it back into a
//! typed JSON value.
//!
//! Compatibility table:
//! - `bool` accepts JSON booleans.
//! - Integer kinds accept JSON numbers with no fractional part that fit the
//!   kind's bit width and signedness.
//! - `float`/`double` accept any JSON number.
//! - `string`, `enum`, and unrecognized kinds accept JSON strings.
//! - `message` accepts JSON objects.
//!
//! Repeated fields require a JSON array whose elements each satisfy the rule.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Number;
use serde_json::Value;
use thiserror::Error;

use crate::core::AdditionalKeyBinding;
use crate::core::FieldDescriptor;
use crate::core::PolicyAssignment;
use crate::core::SchemaDescriptor;
use crate::core::ValueEncodingError;
use crate::core::WireType;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Validation failure for a caller-declared assignment.
///
/// # Invariants
/// - Every variant names the schema it was raised against.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Field is not declared by the schema.
    #[error("field {field} is not defined in schema {schema}")]
    UnknownField {
        /// Schema name.
        schema: String,
        /// Offending field name.
        field: String,
    },
    /// Value does not match the declared wire type.
    #[error("value for field {field} in schema {schema} is {found}, expected {expected}")]
    TypeMismatch {
        /// Schema name.
        schema: String,
        /// Offending field name.
        field: String,
        /// Index of the offending element for repeated fields.
        element: Option<usize>,
        /// Expected shape (`int64`, `[]string`, ...).
        expected: String,
        /// JSON kind actually supplied.
        found: &'static str,
    },
    /// Value was not valid JSON.
    #[error(transparent)]
    InvalidEncoding(#[from] ValueEncodingError),
    /// Schema declares additional target keys but none were supplied.
    #[error("schema {schema} requires additional target keys ({required})")]
    MissingAdditionalTargetKeys {
        /// Schema name.
        schema: String,
        /// Comma-separated key names the schema accepts.
        required: String,
    },
    /// Supplied additional target key is not declared by the schema.
    #[error("schema {schema} does not accept additional target key {key}")]
    UnsupportedAdditionalTargetKey {
        /// Schema name.
        schema: String,
        /// Offending key name.
        key: String,
    },
}

/// Conversion failure for a value read back from the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Resolved value names a field the schema does not declare.
    #[error("resolved field {field} is not defined in schema {schema}")]
    UnknownField {
        /// Schema name.
        schema: String,
        /// Offending field name.
        field: String,
    },
    /// Raw string does not parse as the declared wire type.
    #[error("cannot convert '{raw}' to {wire_type} for field {field} in schema {schema}")]
    Unparseable {
        /// Schema name.
        schema: String,
        /// Offending field name.
        field: String,
        /// Original raw value.
        raw: String,
        /// Declared wire type.
        wire_type: WireType,
    },
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates an assignment and its target key bindings against a schema.
///
/// # Errors
///
/// Returns [`ValidationError`] for the first unknown field, mismatched value,
/// or additional target key violation.
pub fn validate(
    descriptor: &SchemaDescriptor,
    assignment: &PolicyAssignment,
    bindings: &[AdditionalKeyBinding],
) -> Result<(), ValidationError> {
    for (name, value) in &assignment.values {
        let field = descriptor.field(name).ok_or_else(|| ValidationError::UnknownField {
            schema: descriptor.name.clone(),
            field: name.clone(),
        })?;
        check_value(&descriptor.name, field, value)?;
    }
    validate_target_keys(descriptor, bindings)
}

/// Validates additional target key bindings against the schema declaration.
///
/// # Errors
///
/// Returns [`ValidationError`] when required keys are missing or a supplied
/// key is not declared.
pub fn validate_target_keys(
    descriptor: &SchemaDescriptor,
    bindings: &[AdditionalKeyBinding],
) -> Result<(), ValidationError> {
    if descriptor.requires_additional_keys() && bindings.is_empty() {
        return Err(ValidationError::MissingAdditionalTargetKeys {
            schema: descriptor.name.clone(),
            required: descriptor
                .additional_target_key_names
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        });
    }
    if let Some(binding) = bindings
        .iter()
        .find(|binding| !descriptor.additional_target_key_names.contains(&binding.key))
    {
        return Err(ValidationError::UnsupportedAdditionalTargetKey {
            schema: descriptor.name.clone(),
            key: binding.key.clone(),
        });
    }
    Ok(())
}

/// Checks one decoded value against a field descriptor.
///
/// # Errors
///
/// Returns [`ValidationError::TypeMismatch`] when the value is incompatible.
pub fn check_value(
    schema: &str,
    field: &FieldDescriptor,
    value: &Value,
) -> Result<(), ValidationError> {
    let mismatch = |element: Option<usize>, found: &Value| ValidationError::TypeMismatch {
        schema: schema.to_string(),
        field: field.name.clone(),
        element,
        expected: expected_shape(field),
        found: json_kind(found),
    };
    if !field.repeated {
        return if accepts(field.wire_type, value) { Ok(()) } else { Err(mismatch(None, value)) };
    }
    let Value::Array(elements) = value else {
        return Err(mismatch(None, value));
    };
    for (index, element) in elements.iter().enumerate() {
        if !accepts(field.wire_type, element) {
            return Err(mismatch(Some(index), element));
        }
    }
    Ok(())
}

/// Returns true when a single JSON value satisfies the wire type's rule.
#[must_use]
pub fn accepts(wire_type: WireType, value: &Value) -> bool {
    match wire_type {
        WireType::Bool => value.is_boolean(),
        WireType::Int32 | WireType::Int64 | WireType::Uint32 | WireType::Uint64 => {
            value.as_number().is_some_and(|number| is_integral_in_range(wire_type, number))
        }
        WireType::Float | WireType::Double => value.is_number(),
        WireType::String | WireType::Enum | WireType::Unrecognized => value.is_string(),
        WireType::Message => value.is_object(),
    }
}

/// Returns the inclusive bounds of an integer wire type.
fn integer_bounds(wire_type: WireType) -> (i128, i128) {
    match wire_type {
        WireType::Int32 => (i128::from(i32::MIN), i128::from(i32::MAX)),
        WireType::Uint32 => (0, i128::from(u32::MAX)),
        WireType::Uint64 => (0, i128::from(u64::MAX)),
        _ => (i128::from(i64::MIN), i128::from(i64::MAX)),
    }
}

/// Returns true when a JSON number is whole and fits the integer wire type.
#[allow(
    clippy::float_cmp,
    clippy::cast_precision_loss,
    reason = "Bounds are powers of two, exact in f64; integrality needs exact comparison."
)]
fn is_integral_in_range(wire_type: WireType, number: &Number) -> bool {
    let (min, max) = integer_bounds(wire_type);
    let bounds = min ..= max;
    if let Some(int) = number.as_i64() {
        return bounds.contains(&i128::from(int));
    }
    if let Some(int) = number.as_u64() {
        return bounds.contains(&i128::from(int));
    }
    let lower = min as f64;
    let upper_exclusive = (max + 1) as f64;
    number.as_f64().is_some_and(|float| {
        float.is_finite() && float.trunc() == float && float >= lower && float < upper_exclusive
    })
}

/// Returns the expected shape label for a field.
fn expected_shape(field: &FieldDescriptor) -> String {
    if field.repeated {
        format!("[]{}", field.wire_type)
    } else {
        field.wire_type.to_string()
    }
}

/// Returns the JSON kind label of a value.
#[must_use]
pub const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// SECTION: Conversion
// ============================================================================

/// Converts a raw resolved value into a typed JSON value.
///
/// Strings are parsed per the field's wire type; repeated fields convert
/// element-wise. Non-string raw values are already typed and pass through.
///
/// # Errors
///
/// Returns [`ConversionError`] when the field is unknown or a string fails to
/// parse as the declared type.
pub fn convert(
    descriptor: &SchemaDescriptor,
    field_name: &str,
    raw: &Value,
) -> Result<Value, ConversionError> {
    let field = descriptor.field(field_name).ok_or_else(|| ConversionError::UnknownField {
        schema: descriptor.name.clone(),
        field: field_name.to_string(),
    })?;
    match raw {
        Value::Array(elements) if field.repeated => elements
            .iter()
            .map(|element| convert_element(&descriptor.name, field, element))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => convert_element(&descriptor.name, field, other),
    }
}

/// Converts one scalar element.
fn convert_element(
    schema: &str,
    field: &FieldDescriptor,
    raw: &Value,
) -> Result<Value, ConversionError> {
    let Value::String(text) = raw else {
        return Ok(raw.clone());
    };
    parse_scalar(field.wire_type, text).ok_or_else(|| ConversionError::Unparseable {
        schema: schema.to_string(),
        field: field.name.clone(),
        raw: text.clone(),
        wire_type: field.wire_type,
    })
}

/// Parses a string per a wire type.
fn parse_scalar(wire_type: WireType, text: &str) -> Option<Value> {
    match wire_type {
        WireType::Bool => parse_bool(text).map(Value::Bool),
        WireType::Int32 => text.parse::<i32>().ok().map(Value::from),
        WireType::Int64 => text.parse::<i64>().ok().map(Value::from),
        WireType::Uint32 => text.parse::<u32>().ok().map(Value::from),
        WireType::Uint64 => text.parse::<u64>().ok().map(Value::from),
        WireType::Float | WireType::Double => {
            text.parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
        }
        WireType::String | WireType::Enum | WireType::Message | WireType::Unrecognized => {
            Some(Value::String(text.to_string()))
        }
    }
}

/// Parses the boolean spellings the remote API may emit.
fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "true" | "True" | "TRUE" | "t" | "T" | "1" => Some(true),
        "false" | "False" | "FALSE" | "f" | "F" | "0" => Some(false),
        _ => None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
