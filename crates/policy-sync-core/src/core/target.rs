// crates/policy-sync-core/src/core/target.rs
// ============================================================================
// Module: Policy Targets
// Description: Target kinds, target keys, and additional key bindings.
// Purpose: Describe where a policy applies in the management hierarchy.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A policy target is either an organizational unit or a group, optionally
//! narrowed by additional target keys such as an application identity. Target
//! keys serialize with the remote API field names so adapters can embed them
//! directly in request bodies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix some callers carry on identifiers copied from directory listings.
const ID_PREFIX: &str = "id:";

// ============================================================================
// SECTION: Target Kind
// ============================================================================

/// Kind of policy target.
///
/// # Invariants
/// - [`TargetKind::as_str`] returns the collection prefix used by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Organizational unit target (`orgunits/<id>`).
    OrgUnit,
    /// Group target (`groups/<id>`).
    Group,
}

impl TargetKind {
    /// Returns the resource collection prefix for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OrgUnit => "orgunits",
            Self::Group => "groups",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a target kind string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown target kind: {0}")]
pub struct UnknownTargetKind(pub String);

impl FromStr for TargetKind {
    type Err = UnknownTargetKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "orgunits" | "org_unit" | "orgunit" => Ok(Self::OrgUnit),
            "groups" | "group" => Ok(Self::Group),
            other => Err(UnknownTargetKind(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Additional Key Bindings
// ============================================================================

/// One caller-declared additional target key binding.
///
/// # Invariants
/// - A key name may appear in several bindings of the same declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdditionalKeyBinding {
    /// Additional target key name (for example `app_id`).
    pub key: String,
    /// Bound value (for example `chrome:abcdef`).
    pub value: String,
}

impl AdditionalKeyBinding {
    /// Creates a binding from a key name and value.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Target Key
// ============================================================================

/// Fully qualified policy target.
///
/// # Invariants
/// - `target_resource` is `"<kind prefix>/<id>"` with any `id:` prefix removed.
/// - `additional_keys` holds at most one value per key name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetKey {
    /// Target resource URI (`orgunits/<id>` or `groups/<id>`).
    pub target_resource: String,
    /// Additional target keys narrowing the target.
    #[serde(rename = "additionalTargetKeys", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_keys: BTreeMap<String, String>,
}

impl TargetKey {
    /// Creates a target key without additional keys.
    #[must_use]
    pub fn new(kind: TargetKind, target_id: &str) -> Self {
        Self {
            target_resource: format!("{}/{}", kind.as_str(), normalize_target_id(target_id)),
            additional_keys: BTreeMap::new(),
        }
    }

    /// Returns a copy of the key narrowed by a single additional binding.
    #[must_use]
    pub fn with_binding(&self, binding: &AdditionalKeyBinding) -> Self {
        let mut additional_keys = BTreeMap::new();
        additional_keys.insert(binding.key.clone(), binding.value.clone());
        Self {
            target_resource: self.target_resource.clone(),
            additional_keys,
        }
    }

    /// Returns the target kind encoded in the resource URI, if recognized.
    #[must_use]
    pub fn kind(&self) -> Option<TargetKind> {
        let (prefix, _) = self.target_resource.split_once('/')?;
        prefix.parse().ok()
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target_resource)?;
        for (key, value) in &self.additional_keys {
            write!(f, "[{key}={value}]")?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Policy Target
// ============================================================================

/// Caller-facing description of where policies are applied.
///
/// # Invariants
/// - `additional_keys` keeps declaration order; planning decides how repeated
///   key names are treated per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTarget {
    /// Kind of target.
    pub kind: TargetKind,
    /// Target identifier, with or without the `id:` prefix.
    pub target_id: String,
    /// Declared additional key bindings.
    #[serde(default)]
    pub additional_keys: Vec<AdditionalKeyBinding>,
}

impl PolicyTarget {
    /// Creates a target without additional keys.
    #[must_use]
    pub fn new(kind: TargetKind, target_id: impl Into<String>) -> Self {
        Self {
            kind,
            target_id: target_id.into(),
            additional_keys: Vec::new(),
        }
    }

    /// Parses the kind from its string form.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownTargetKind`] when `kind` is not recognized.
    pub fn parse(
        kind: &str,
        target_id: impl Into<String>,
        additional_keys: Vec<AdditionalKeyBinding>,
    ) -> Result<Self, UnknownTargetKind> {
        Ok(Self {
            kind: kind.parse()?,
            target_id: target_id.into(),
            additional_keys,
        })
    }

    /// Appends an additional key binding.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_keys.push(AdditionalKeyBinding::new(key, value));
        self
    }

    /// Returns the target key with bindings collapsed to one value per name.
    #[must_use]
    pub fn collapsed_key(&self) -> TargetKey {
        let (additional_keys, _) = collapse_bindings(&self.additional_keys);
        TargetKey {
            target_resource: TargetKey::new(self.kind, &self.target_id).target_resource,
            additional_keys,
        }
    }
}

/// Strips the optional `id:` prefix from a target identifier.
#[must_use]
pub fn normalize_target_id(target_id: &str) -> &str {
    target_id.strip_prefix(ID_PREFIX).unwrap_or(target_id)
}

/// Collapses bindings into one value per key name; later bindings win.
///
/// Returns the collapsed map and the key names that were declared more than once.
#[must_use]
pub fn collapse_bindings(
    bindings: &[AdditionalKeyBinding],
) -> (BTreeMap<String, String>, Vec<String>) {
    let mut collapsed = BTreeMap::new();
    let mut repeated = Vec::new();
    for binding in bindings {
        if collapsed.insert(binding.key.clone(), binding.value.clone()).is_some()
            && !repeated.contains(&binding.key)
        {
            repeated.push(binding.key.clone());
        }
    }
    (collapsed, repeated)
}
