// crates/policy-sync-core/src/core/file.rs
// ============================================================================
// Module: Policy Files
// Description: Uploaded file records, content digests, and policy field names.
// Purpose: Describe files referenced by policy values such as wallpapers.
// Dependencies: serde, sha2, thiserror
// ============================================================================

//! ## Overview
//! Some policies reference a file instead of an inline value. The file is
//! uploaded for a fully qualified policy field (`<schema>.<field>`) and the
//! API answers with a download URI that is then used as the field's value.
//! The API has no read or delete for uploads, so an [`UploadedPolicyFile`]
//! keeps the SHA-256 digest of the uploaded bytes; comparing digests tells a
//! caller when the local content changed and must be uploaded again.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Policy Field
// ============================================================================

/// Error raised when a policy field name is not `<schema>.<field>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid policy field {0}: expected <schema>.<field>")]
pub struct InvalidPolicyField(pub String);

/// Fully qualified policy field split into schema and field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyField<'a> {
    /// Fully qualified schema name.
    pub schema_name: &'a str,
    /// Leaf field name within the schema.
    pub field_name: &'a str,
}

impl<'a> PolicyField<'a> {
    /// Splits `raw` at its last dot.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPolicyField`] when either part is empty, the schema
    /// is not namespaced, or the name contains whitespace.
    pub fn parse(raw: &'a str) -> Result<Self, InvalidPolicyField> {
        let invalid = || InvalidPolicyField(raw.to_string());
        if raw.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let (schema_name, field_name) = raw.rsplit_once('.').ok_or_else(invalid)?;
        if field_name.is_empty() || !schema_name.contains('.') {
            return Err(invalid());
        }
        if schema_name.split('.').any(str::is_empty) {
            return Err(invalid());
        }
        Ok(Self {
            schema_name,
            field_name,
        })
    }
}

// ============================================================================
// SECTION: Content
// ============================================================================

/// Content type sent for files whose extension is not recognized.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Returns the upload content type for a file name, by extension.
#[must_use]
pub fn content_type_for(file_name: &str) -> &'static str {
    let Some(extension) = Path::new(file_name).extension().and_then(|ext| ext.to_str()) else {
        return DEFAULT_CONTENT_TYPE;
    };
    if extension.eq_ignore_ascii_case("jpg") || extension.eq_ignore_ascii_case("jpeg") {
        "image/jpeg"
    } else if extension.eq_ignore_ascii_case("png") {
        "image/png"
    } else {
        DEFAULT_CONTENT_TYPE
    }
}

/// Returns the lowercase hex SHA-256 digest of `content`.
#[must_use]
pub fn content_sha256(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex_encode(&hasher.finalize())
}

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

// ============================================================================
// SECTION: Uploaded File
// ============================================================================

/// Record of a completed policy file upload.
///
/// # Invariants
/// - `download_uri` is non-empty.
/// - `sha256` is the lowercase hex digest of the uploaded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedPolicyFile {
    /// Fully qualified policy field the file was uploaded for.
    pub policy_field: String,
    /// URI to use as the policy field's value.
    pub download_uri: String,
    /// Content type sent with the upload.
    pub content_type: String,
    /// Digest of the uploaded bytes.
    pub sha256: String,
    /// Size of the uploaded bytes.
    pub size: u64,
}

impl UploadedPolicyFile {
    /// Returns true when `content` is byte-for-byte what was uploaded.
    #[must_use]
    pub fn matches_content(&self, content: &[u8]) -> bool {
        content_sha256(content) == self.sha256
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
