// crates/policy-sync-core/src/runtime/planner.rs
// ============================================================================
// Module: Target Batch Planner
// Description: Group assignments into per-target batch units.
// Purpose: Encode the org unit and group batching rules in one place.
// Dependencies: crate::core, tracing
// ============================================================================

//! ## Overview
//! The remote API batches differently per target kind:
//! - Org units accept one call carrying every additional key at once, so the
//!   planner collapses bindings into a single target key (one value per key
//!   name, later bindings win) and emits exactly one unit.
//! - Groups with additional keys accept one key per call, so the planner emits
//!   one unit per `(key name, value)` pair in first-appearance order, each
//!   carrying all assignments.
//! - Groups without additional keys fail unreliably on calls mixing policies, so
//!   the planner emits one unit per assignment.
//!
//! Planning performs no I/O.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::warn;

use crate::core::AdditionalKeyBinding;
use crate::core::BatchOperation;
use crate::core::BatchUnit;
use crate::core::PolicyAssignment;
use crate::core::TargetKey;
use crate::core::TargetKind;
use crate::core::collapse_bindings;

// ============================================================================
// SECTION: Planner
// ============================================================================

/// Intent of a planning pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanIntent {
    /// Set assignment values.
    Apply,
    /// Remove assignments (delete for groups, inherit for org units).
    Remove,
}

/// Pure planner for one target kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetBatchPlanner {
    /// Kind of every target planned by this instance.
    kind: TargetKind,
}

impl TargetBatchPlanner {
    /// Creates a planner for `kind`.
    #[must_use]
    pub const fn new(kind: TargetKind) -> Self {
        Self {
            kind,
        }
    }

    /// Returns the planner's target kind.
    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Returns the batch operation used for `intent` on this kind.
    #[must_use]
    pub const fn operation(&self, intent: PlanIntent) -> BatchOperation {
        match (intent, self.kind) {
            (PlanIntent::Apply, _) => BatchOperation::Modify,
            (PlanIntent::Remove, TargetKind::Group) => BatchOperation::Delete,
            (PlanIntent::Remove, TargetKind::OrgUnit) => BatchOperation::Inherit,
        }
    }

    /// Plans units that set `assignments` on `target_id`.
    #[must_use]
    pub fn plan_apply(
        &self,
        target_id: &str,
        bindings: &[AdditionalKeyBinding],
        assignments: &[PolicyAssignment],
    ) -> Vec<BatchUnit> {
        self.plan(PlanIntent::Apply, target_id, bindings, assignments)
    }

    /// Plans units that remove `assignments` from `target_id`.
    #[must_use]
    pub fn plan_remove(
        &self,
        target_id: &str,
        bindings: &[AdditionalKeyBinding],
        assignments: &[PolicyAssignment],
    ) -> Vec<BatchUnit> {
        self.plan(PlanIntent::Remove, target_id, bindings, assignments)
    }

    /// Plans units for `intent`. An empty assignment list plans nothing.
    ///
    /// Group targets without bindings get one single-assignment unit per
    /// assignment; every other shape gets one unit per target key.
    #[must_use]
    pub fn plan(
        &self,
        intent: PlanIntent,
        target_id: &str,
        bindings: &[AdditionalKeyBinding],
        assignments: &[PolicyAssignment],
    ) -> Vec<BatchUnit> {
        if assignments.is_empty() {
            return Vec::new();
        }
        let operation = self.operation(intent);
        let base = TargetKey::new(self.kind, target_id);
        if self.kind == TargetKind::Group && bindings.is_empty() {
            return assignments
                .iter()
                .map(|assignment| BatchUnit {
                    target_key: base.clone(),
                    assignments: vec![assignment.clone()],
                    operation,
                })
                .collect();
        }
        self.target_keys(&base, bindings)
            .into_iter()
            .map(|target_key| BatchUnit {
                target_key,
                assignments: assignments.to_vec(),
                operation,
            })
            .collect()
    }

    /// Expands bindings into the target keys this kind dispatches against.
    fn target_keys(&self, base: &TargetKey, bindings: &[AdditionalKeyBinding]) -> Vec<TargetKey> {
        match self.kind {
            TargetKind::OrgUnit => {
                let (additional_keys, repeated) = collapse_bindings(bindings);
                for key in &repeated {
                    warn!(
                        target_key = %base,
                        key = key.as_str(),
                        "additional target key declared more than once; last value wins"
                    );
                }
                vec![TargetKey {
                    target_resource: base.target_resource.clone(),
                    additional_keys,
                }]
            }
            TargetKind::Group => {
                group_bindings(bindings).iter().map(|binding| base.with_binding(binding)).collect()
            }
        }
    }
}

/// Orders bindings by first appearance of their key name, dropping exact duplicates.
fn group_bindings(bindings: &[AdditionalKeyBinding]) -> Vec<AdditionalKeyBinding> {
    let mut key_order: Vec<&str> = Vec::new();
    for binding in bindings {
        if !key_order.contains(&binding.key.as_str()) {
            key_order.push(binding.key.as_str());
        }
    }
    let mut grouped: Vec<AdditionalKeyBinding> = Vec::new();
    for key in key_order {
        for binding in bindings.iter().filter(|binding| binding.key == key) {
            if !grouped.contains(binding) {
                grouped.push(binding.clone());
            }
        }
    }
    grouped
}

// ============================================================================
// SECTION: Tests
// ============================================================================
