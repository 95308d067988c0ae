// crates/policy-sync-core/src/runtime/engine.rs
// ============================================================================
// Module: Policy Sync Engine
// Description: Validate, plan, dispatch, read back, and await consistency.
// Purpose: Provide the single execution path for policy sync operations.
// Dependencies: crate::{core, interfaces, runtime}, tracing
// ============================================================================

//! ## Overview
//! [`PolicyEngine`] owns the remote API collaborator and a clock. Every write
//! operation validates all assignments against freshly fetched schemas before
//! the first mutating call, then dispatches the planned batch units in order.
//! Once dispatch starts there is no rollback: a failing unit stops the
//! operation with [`PolicyError::DispatchFailed`] reporting how far it got.
//!
//! Each remote call runs inside [`retry_with_budget`]. Batch dispatch also
//! retries "not found", since a newly created target may not be visible yet.
//! Policy file uploads check the target field against its schema first.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::core::BatchOperation;
use crate::core::BatchUnit;
use crate::core::GroupPriorityOrdering;
use crate::core::PolicyField;
use crate::core::PolicyAssignment;
use crate::core::PolicyTarget;
use crate::core::TargetKey;
use crate::core::TargetKind;
use crate::core::UploadedPolicyFile;
use crate::core::content_sha256;
use crate::core::content_type_for;
use crate::interfaces::ApiError;
use crate::interfaces::Clock;
use crate::interfaces::PolicyDispatcher;
use crate::interfaces::PolicyFileUploader;
use crate::interfaces::PolicyResolver;
use crate::interfaces::PriorityOrderingApi;
use crate::interfaces::ResourceKind;
use crate::interfaces::ResourceReader;
use crate::interfaces::SchemaSource;
use crate::runtime::catalog::SchemaCatalog;
use crate::runtime::codec;
use crate::runtime::codec::ValidationError;
use crate::runtime::error::PolicyError;
use crate::runtime::planner::TargetBatchPlanner;
use crate::runtime::poller::ConsistencyPoller;
use crate::runtime::poller::ConsistencyReport;
use crate::runtime::retry::RetryError;
use crate::runtime::retry::RetryPolicy;
use crate::runtime::retry::retry_with_budget;

// ============================================================================
// SECTION: Engine Configuration
// ============================================================================

/// Default budget for a consistency wait.
pub const DEFAULT_CONSISTENCY_TIMEOUT: Duration = Duration::from_secs(600);
/// Default delay between consistency reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Configuration for the policy sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Retry policy applied to every remote call.
    pub api_retry: RetryPolicy,
    /// Budget used when a consistency wait does not name one.
    pub consistency_timeout: Duration,
    /// Delay between consistency reads.
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_retry: RetryPolicy::default(),
            consistency_timeout: DEFAULT_CONSISTENCY_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Result of dispatching one batch unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitOutcome {
    /// The mutating call was accepted.
    Applied,
    /// The call was rejected in a tolerated way and skipped.
    Skipped,
}

/// Policy sync engine over a remote API collaborator.
///
/// Operations take `&self`; the engine holds no state across calls.
pub struct PolicyEngine<A, C> {
    /// Remote API collaborator.
    api: A,
    /// Clock driving retries and polling.
    clock: C,
    /// Engine configuration.
    config: EngineConfig,
}

impl<A, C> PolicyEngine<A, C>
where
    C: Clock,
{
    /// Creates an engine.
    #[must_use]
    pub const fn new(api: A, clock: C, config: EngineConfig) -> Self {
        Self {
            api,
            clock,
            config,
        }
    }

    /// Returns the remote API collaborator.
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs one remote call under the configured retry policy.
    fn call<T>(
        &self,
        operation: &str,
        is_retryable: impl Fn(&ApiError) -> bool,
        attempt: impl FnMut(u32) -> Result<T, ApiError>,
    ) -> Result<T, RetryError<ApiError>> {
        retry_with_budget(&self.clock, &self.config.api_retry, operation, is_retryable, attempt)
    }
}

// ============================================================================
// SECTION: Write Operations
// ============================================================================

impl<A, C> PolicyEngine<A, C>
where
    A: SchemaSource + PolicyDispatcher,
    C: Clock,
{
    /// Validates and applies `assignments` to `target`.
    ///
    /// Returns the number of mutating calls issued.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when validation fails (nothing is dispatched)
    /// or [`PolicyError::DispatchFailed`] when a batch unit fails.
    pub fn plan_and_apply(
        &self,
        target: &PolicyTarget,
        assignments: &[PolicyAssignment],
    ) -> Result<usize, PolicyError> {
        self.validate_assignments(target, assignments)?;
        let units = TargetBatchPlanner::new(target.kind).plan_apply(
            &target.target_id,
            &target.additional_keys,
            assignments,
        );
        self.dispatch_units(target.kind, &units)
    }

    /// Removes `assignments` from `target` (delete for groups, inherit for org units).
    ///
    /// Returns the number of mutating calls issued.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::DispatchFailed`] when a batch unit fails.
    pub fn plan_and_remove(
        &self,
        target: &PolicyTarget,
        assignments: &[PolicyAssignment],
    ) -> Result<usize, PolicyError> {
        let units = TargetBatchPlanner::new(target.kind).plan_remove(
            &target.target_id,
            &target.additional_keys,
            assignments,
        );
        self.dispatch_units(target.kind, &units)
    }

    /// Replaces `old` with `new` on `target`.
    ///
    /// The new set is validated before anything is removed. Removal and
    /// application are dispatched as one ordered sequence of units.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when validation fails or
    /// [`PolicyError::DispatchFailed`] when any unit fails.
    pub fn plan_and_replace(
        &self,
        target: &PolicyTarget,
        old: &[PolicyAssignment],
        new: &[PolicyAssignment],
    ) -> Result<usize, PolicyError> {
        self.validate_assignments(target, new)?;
        let planner = TargetBatchPlanner::new(target.kind);
        let mut units = planner.plan_remove(&target.target_id, &target.additional_keys, old);
        units.extend(planner.plan_apply(&target.target_id, &target.additional_keys, new));
        self.dispatch_units(target.kind, &units)
    }

    /// Fetches every referenced schema and validates all assignments.
    fn validate_assignments(
        &self,
        target: &PolicyTarget,
        assignments: &[PolicyAssignment],
    ) -> Result<(), PolicyError> {
        let mut catalog = SchemaCatalog::new(&self.api, &self.clock, self.config.api_retry);
        for assignment in assignments {
            let descriptor = catalog.fetch(&assignment.schema_name)?;
            codec::validate(descriptor, assignment, &target.additional_keys)?;
        }
        debug!(
            target_id = target.target_id.as_str(),
            kind = target.kind.as_str(),
            assignments = assignments.len(),
            schemas = catalog.len(),
            "validated policy assignments"
        );
        Ok(())
    }

    /// Dispatches units in order, stopping at the first failure.
    fn dispatch_units(&self, kind: TargetKind, units: &[BatchUnit]) -> Result<usize, PolicyError> {
        let planned = units.len();
        let mut applied = 0;
        let mut skipped = 0;
        for unit in units {
            match self.dispatch_unit(kind, unit) {
                Ok(UnitOutcome::Applied) => applied += 1,
                Ok(UnitOutcome::Skipped) => skipped += 1,
                Err(err) => {
                    warn!(
                        target_key = %unit.target_key,
                        operation = unit.operation.as_str(),
                        succeeded = applied,
                        skipped,
                        planned,
                        error = %err,
                        "batch unit failed; stopping dispatch"
                    );
                    return Err(PolicyError::DispatchFailed {
                        succeeded: applied,
                        skipped,
                        planned,
                        source: Box::new(err),
                    });
                }
            }
        }
        info!(kind = kind.as_str(), planned, applied, skipped, "dispatched policy batch units");
        Ok(applied)
    }

    /// Dispatches one unit with retries.
    fn dispatch_unit(&self, kind: TargetKind, unit: &BatchUnit) -> Result<UnitOutcome, PolicyError> {
        let operation = format!("{} batch {}", kind.as_str(), unit.operation.as_str());
        debug!(
            target_key = %unit.target_key,
            operation = operation.as_str(),
            schemas = unit.schema_names().join(","),
            "dispatching batch unit"
        );
        let retryable = |err: &ApiError| err.is_transient() || err.is_not_found();
        let result = match unit.operation {
            BatchOperation::Modify => {
                let requests = unit.modify_requests();
                self.call(&operation, retryable, |_| self.api.batch_modify(kind, &requests))
            }
            BatchOperation::Delete => {
                let removals = unit.removals();
                self.call(&operation, retryable, |_| self.api.batch_delete(&removals))
            }
            BatchOperation::Inherit => {
                let removals = unit.removals();
                self.call(&operation, retryable, |_| self.api.batch_inherit(&removals))
            }
        };
        match result {
            Ok(()) => Ok(UnitOutcome::Applied),
            Err(RetryError::Permanent(err))
                if unit.operation == BatchOperation::Delete && err.is_app_not_installed() =>
            {
                debug!(
                    target_key = %unit.target_key,
                    error = %err,
                    "skipping delete for applications no longer installed"
                );
                Ok(UnitOutcome::Skipped)
            }
            Err(err) => Err(PolicyError::from_retry(&operation, err)),
        }
    }
}

// ============================================================================
// SECTION: Read Operations
// ============================================================================

impl<A, C> PolicyEngine<A, C>
where
    A: SchemaSource + PolicyResolver,
    C: Clock,
{
    /// Resolves the current values of `schema_names` on `target` and converts them.
    ///
    /// Schemas with no resolved policy are omitted. When several policies
    /// resolve for one schema, the first is used and a warning is logged.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when a resolve or schema fetch fails, or when a
    /// resolved value cannot be converted.
    pub fn read_and_decode(
        &self,
        target: &PolicyTarget,
        schema_names: &[String],
    ) -> Result<Vec<PolicyAssignment>, PolicyError> {
        let target_key = target.collapsed_key();
        let mut catalog = SchemaCatalog::new(&self.api, &self.clock, self.config.api_retry);
        let mut assignments = Vec::with_capacity(schema_names.len());
        for schema_name in schema_names {
            let resolved = self
                .call("resolve policies", ApiError::is_transient, |_| {
                    self.api.resolve(&target_key, schema_name)
                })
                .map_err(|err| PolicyError::from_retry("resolve policies", err))?;
            let Some(first) = resolved.first() else {
                debug!(
                    target_key = %target_key,
                    schema = schema_name.as_str(),
                    "no resolved policy; skipping"
                );
                continue;
            };
            if resolved.len() > 1 {
                warn!(
                    target_key = %target_key,
                    schema = schema_name.as_str(),
                    resolved = resolved.len(),
                    "multiple policies resolved; using the first"
                );
            }
            let descriptor = catalog.fetch(&first.policy_schema)?;
            let mut values = BTreeMap::new();
            for (field, raw) in &first.value {
                values.insert(field.clone(), codec::convert(descriptor, field, raw)?);
            }
            assignments.push(PolicyAssignment::new(first.policy_schema.clone(), values));
        }
        Ok(assignments)
    }
}

// ============================================================================
// SECTION: Consistency
// ============================================================================

impl<A, C> PolicyEngine<A, C>
where
    A: ResourceReader,
    C: Clock,
{
    /// Waits until `resource_id` reports `required_stable_count` consecutive
    /// unchanged reads.
    ///
    /// `timeout` defaults to the configured consistency budget.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidArgument`] for an empty resource id and
    /// [`PolicyError::ConsistencyTimeout`] when the budget elapses first.
    pub fn await_consistency(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        required_stable_count: u32,
        timeout: Option<Duration>,
    ) -> Result<ConsistencyReport, PolicyError> {
        if resource_id.is_empty() {
            return Err(PolicyError::InvalidArgument(format!("{kind} id must not be empty")));
        }
        let poller = ConsistencyPoller::new(&self.api, &self.clock, self.config.poll_interval);
        poller.wait(
            kind,
            resource_id,
            required_stable_count,
            timeout.unwrap_or(self.config.consistency_timeout),
        )
    }
}

// ============================================================================
// SECTION: Group Priority Ordering
// ============================================================================

impl<A, C> PolicyEngine<A, C>
where
    A: PriorityOrderingApi,
    C: Clock,
{
    /// Replaces the group priority ordering described by `ordering`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidArgument`] when the schema or target is
    /// empty and [`PolicyError`] when the update fails.
    pub fn set_group_priority_ordering(
        &self,
        ordering: &GroupPriorityOrdering,
    ) -> Result<(), PolicyError> {
        if ordering.policy_schema.is_empty() || ordering.target_key.target_resource.is_empty() {
            return Err(PolicyError::InvalidArgument(
                "group priority ordering requires a policy schema and target resource".to_string(),
            ));
        }
        self.call("update group priority ordering", ApiError::is_transient, |_| {
            self.api.update_group_priority_ordering(ordering)
        })
        .map_err(|err| PolicyError::from_retry("update group priority ordering", err))?;
        info!(
            id = ordering.id(),
            groups = ordering.group_ids.len(),
            "updated group priority ordering"
        );
        Ok(())
    }

    /// Returns the group ids ordered for `policy_schema` under `target_key`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the list call fails.
    pub fn read_group_priority_ordering(
        &self,
        target_key: &TargetKey,
        policy_schema: &str,
        policy_namespace: &str,
    ) -> Result<Vec<String>, PolicyError> {
        self.call("list group priority ordering", ApiError::is_transient, |_| {
            self.api.list_group_priority_ordering(target_key, policy_schema, policy_namespace)
        })
        .map_err(|err| PolicyError::from_retry("list group priority ordering", err))
    }

    /// Clears the group priority ordering by writing an empty group list.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the update fails.
    pub fn clear_group_priority_ordering(
        &self,
        target_key: &TargetKey,
        policy_schema: &str,
        policy_namespace: &str,
    ) -> Result<(), PolicyError> {
        self.set_group_priority_ordering(&GroupPriorityOrdering {
            target_key: target_key.clone(),
            policy_schema: policy_schema.to_string(),
            policy_namespace: policy_namespace.to_string(),
            group_ids: Vec::new(),
        })
    }
}

// ============================================================================
// SECTION: Policy Files
// ============================================================================

impl<A, C> PolicyEngine<A, C>
where
    A: SchemaSource + PolicyFileUploader,
    C: Clock,
{
    /// Uploads `content` for `policy_field` and records its digest.
    ///
    /// The field is checked against its schema before anything is uploaded.
    /// The content type is chosen from the extension of `file_name`.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::InvalidArgument`] for a malformed field name or
    /// empty content, [`PolicyError::SchemaNotFound`] or
    /// [`ValidationError::UnknownField`] when the field is not declared, and
    /// [`PolicyError`] when the upload fails.
    pub fn upload_policy_file(
        &self,
        policy_field: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<UploadedPolicyFile, PolicyError> {
        let field = PolicyField::parse(policy_field)?;
        if content.is_empty() {
            return Err(PolicyError::InvalidArgument(format!(
                "file {file_name} for {policy_field} is empty"
            )));
        }
        let mut catalog = SchemaCatalog::new(&self.api, &self.clock, self.config.api_retry);
        let descriptor = catalog.fetch(field.schema_name)?;
        if descriptor.field(field.field_name).is_none() {
            return Err(ValidationError::UnknownField {
                schema: field.schema_name.to_string(),
                field: field.field_name.to_string(),
            }
            .into());
        }
        let content_type = content_type_for(file_name);
        let sha256 = content_sha256(content);
        let download_uri = self
            .call("upload policy file", ApiError::is_transient, |_| {
                self.api.upload_policy_file(policy_field, content_type, content)
            })
            .map_err(|err| PolicyError::from_retry("upload policy file", err))?;
        if download_uri.is_empty() {
            return Err(PolicyError::Api {
                operation: "upload policy file".to_string(),
                source: ApiError::Malformed("upload returned no download uri".to_string()),
            });
        }
        let size = u64::try_from(content.len()).unwrap_or(u64::MAX);
        info!(
            policy_field,
            file_name,
            content_type,
            size,
            sha256 = sha256.as_str(),
            "uploaded policy file"
        );
        Ok(UploadedPolicyFile {
            policy_field: policy_field.to_string(),
            download_uri,
            content_type: content_type.to_string(),
            sha256,
            size,
        })
    }
}
