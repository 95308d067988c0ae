// crates/policy-sync-core/tests/common/mod.rs
// ============================================================================
// Module: Policy Sync Test Fixtures
// Description: Scripted remote API fake, manual clock, and schema builders.
// Purpose: Drive engine, poller, and retry tests deterministically.
// Dependencies: policy-sync-core
// ============================================================================

//! ## Overview
//! [`FakeApi`] implements every collaborator trait from scripted queues and
//! records the calls it receives. [`ManualClock`] advances only when slept.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use policy_sync_core::ApiError;
use policy_sync_core::Clock;
use policy_sync_core::ConditionalRead;
use policy_sync_core::GroupPriorityOrdering;
use policy_sync_core::ModifyRequest;
use policy_sync_core::PolicyDispatcher;
use policy_sync_core::PolicyFileUploader;
use policy_sync_core::PolicyRemoval;
use policy_sync_core::PolicyResolver;
use policy_sync_core::PriorityOrderingApi;
use policy_sync_core::RawFieldDescriptor;
use policy_sync_core::RawMessageType;
use policy_sync_core::RawPolicySchema;
use policy_sync_core::RawSchemaDefinition;
use policy_sync_core::RawTargetKeyName;
use policy_sync_core::ResolvedPolicy;
use policy_sync_core::ResourceKind;
use policy_sync_core::ResourceReader;
use policy_sync_core::RetryPolicy;
use policy_sync_core::SchemaSource;
use policy_sync_core::TargetKey;
use policy_sync_core::TargetKind;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Clock whose time only moves when slept.
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) {
        *self.offset.lock().unwrap() += duration;
        self.sleeps.lock().unwrap().push(duration);
    }
}

impl Clock for &ManualClock {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Short fixed-interval retry policy for tests.
pub fn quick_retry() -> RetryPolicy {
    RetryPolicy {
        budget: Duration::from_secs(10),
        initial_backoff: Duration::from_secs(1),
        max_backoff: Duration::from_secs(4),
        multiplier: 2,
    }
}

// ============================================================================
// SECTION: Fake API
// ============================================================================

/// Dispatch call recorded by the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchCall {
    Modify { kind: TargetKind, requests: Vec<ModifyRequest> },
    Delete(Vec<PolicyRemoval>),
    Inherit(Vec<PolicyRemoval>),
}

impl DispatchCall {
    pub fn target_keys(&self) -> Vec<TargetKey> {
        match self {
            Self::Modify { requests, .. } => {
                requests.iter().map(|request| request.target_key.clone()).collect()
            }
            Self::Delete(removals) | Self::Inherit(removals) => {
                removals.iter().map(|removal| removal.target_key.clone()).collect()
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Modify { requests, .. } => requests.len(),
            Self::Delete(removals) | Self::Inherit(removals) => removals.len(),
        }
    }
}

/// Scripted remote API.
#[derive(Default)]
pub struct FakeApi {
    pub schemas: BTreeMap<String, RawPolicySchema>,
    pub resolved: BTreeMap<String, Vec<ResolvedPolicy>>,
    pub schema_errors: Mutex<VecDeque<ApiError>>,
    pub dispatch_results: Mutex<VecDeque<Result<(), ApiError>>>,
    pub reads: Mutex<VecDeque<Result<ConditionalRead, ApiError>>>,
    pub ordering: Mutex<Vec<String>>,
    pub schema_fetches: Mutex<Vec<String>>,
    pub dispatches: Mutex<Vec<DispatchCall>>,
    pub read_etags: Mutex<Vec<String>>,
    pub ordering_updates: Mutex<Vec<GroupPriorityOrdering>>,
    pub upload_results: Mutex<VecDeque<Result<String, ApiError>>>,
    pub uploads: Mutex<Vec<Upload>>,
}

/// Upload call recorded by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub policy_field: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: RawPolicySchema) -> Self {
        self.schemas.insert(schema.schema_name.clone(), schema);
        self
    }

    pub fn with_resolved(mut self, schema: &str, policies: Vec<ResolvedPolicy>) -> Self {
        self.resolved.insert(schema.to_string(), policies);
        self
    }

    pub fn push_dispatch_result(&self, result: Result<(), ApiError>) {
        self.dispatch_results.lock().unwrap().push_back(result);
    }

    pub fn push_schema_error(&self, error: ApiError) {
        self.schema_errors.lock().unwrap().push_back(error);
    }

    pub fn push_read(&self, read: Result<ConditionalRead, ApiError>) {
        self.reads.lock().unwrap().push_back(read);
    }

    pub fn push_upload_result(&self, result: Result<String, ApiError>) {
        self.upload_results.lock().unwrap().push_back(result);
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn dispatches(&self) -> Vec<DispatchCall> {
        self.dispatches.lock().unwrap().clone()
    }

    pub fn schema_fetches(&self) -> Vec<String> {
        self.schema_fetches.lock().unwrap().clone()
    }

    fn next_dispatch_result(&self) -> Result<(), ApiError> {
        self.dispatch_results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

impl SchemaSource for FakeApi {
    fn get_schema(&self, schema_name: &str) -> Result<RawPolicySchema, ApiError> {
        self.schema_fetches.lock().unwrap().push(schema_name.to_string());
        if let Some(error) = self.schema_errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.schemas
            .get(schema_name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(schema_name.to_string()))
    }
}

impl PolicyResolver for FakeApi {
    fn resolve(
        &self,
        _target: &TargetKey,
        schema_filter: &str,
    ) -> Result<Vec<ResolvedPolicy>, ApiError> {
        Ok(self.resolved.get(schema_filter).cloned().unwrap_or_default())
    }
}

impl PolicyDispatcher for FakeApi {
    fn batch_modify(&self, kind: TargetKind, requests: &[ModifyRequest]) -> Result<(), ApiError> {
        self.dispatches.lock().unwrap().push(DispatchCall::Modify {
            kind,
            requests: requests.to_vec(),
        });
        self.next_dispatch_result()
    }

    fn batch_delete(&self, removals: &[PolicyRemoval]) -> Result<(), ApiError> {
        self.dispatches.lock().unwrap().push(DispatchCall::Delete(removals.to_vec()));
        self.next_dispatch_result()
    }

    fn batch_inherit(&self, removals: &[PolicyRemoval]) -> Result<(), ApiError> {
        self.dispatches.lock().unwrap().push(DispatchCall::Inherit(removals.to_vec()));
        self.next_dispatch_result()
    }
}

impl PolicyFileUploader for FakeApi {
    fn upload_policy_file(
        &self,
        policy_field: &str,
        content_type: &str,
        content: &[u8],
    ) -> Result<String, ApiError> {
        self.uploads.lock().unwrap().push(Upload {
            policy_field: policy_field.to_string(),
            content_type: content_type.to_string(),
            content: content.to_vec(),
        });
        self.upload_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("https://storage.example/files/{policy_field}")))
    }
}

impl ResourceReader for FakeApi {
    fn get_if_none_match(
        &self,
        _kind: ResourceKind,
        _resource_id: &str,
        etag: &str,
    ) -> Result<ConditionalRead, ApiError> {
        self.read_etags.lock().unwrap().push(etag.to_string());
        self.reads.lock().unwrap().pop_front().unwrap_or(Ok(ConditionalRead::NotModified))
    }
}

impl PriorityOrderingApi for FakeApi {
    fn update_group_priority_ordering(
        &self,
        ordering: &GroupPriorityOrdering,
    ) -> Result<(), ApiError> {
        self.ordering_updates.lock().unwrap().push(ordering.clone());
        *self.ordering.lock().unwrap() = ordering.group_ids.clone();
        Ok(())
    }

    fn list_group_priority_ordering(
        &self,
        _target: &TargetKey,
        _policy_schema: &str,
        _policy_namespace: &str,
    ) -> Result<Vec<String>, ApiError> {
        Ok(self.ordering.lock().unwrap().clone())
    }
}

// ============================================================================
// SECTION: Schema Builders
// ============================================================================

/// Builds a raw schema with one message type.
///
/// Each field is `(name, TYPE_*, repeated)`.
pub fn raw_schema(
    schema_name: &str,
    fields: &[(&str, &str, bool)],
    additional_keys: &[&str],
) -> RawPolicySchema {
    RawPolicySchema {
        name: format!("customers/C01/policySchemas/{schema_name}"),
        schema_name: schema_name.to_string(),
        definition: Some(RawSchemaDefinition {
            message_type: vec![RawMessageType {
                name: "Policy".to_string(),
                field: fields
                    .iter()
                    .map(|(name, field_type, repeated)| RawFieldDescriptor {
                        name: (*name).to_string(),
                        label: if *repeated { "LABEL_REPEATED" } else { "LABEL_OPTIONAL" }
                            .to_string(),
                        field_type: (*field_type).to_string(),
                        type_name: None,
                    })
                    .collect(),
            }],
        }),
        additional_target_key_names: additional_keys
            .iter()
            .map(|key| RawTargetKeyName {
                key: (*key).to_string(),
                key_description: String::new(),
            })
            .collect(),
    }
}

/// Schema used across scenarios: `chrome.users.MaxConnectionsPerProxy`.
pub fn max_connections_schema() -> RawPolicySchema {
    raw_schema(
        "chrome.users.MaxConnectionsPerProxy",
        &[("maxConnectionsPerProxy", "TYPE_INT64", false)],
        &[],
    )
}

/// App-scoped schema requiring `app_id`.
pub fn app_install_schema() -> RawPolicySchema {
    raw_schema(
        "chrome.users.apps.InstallType",
        &[("appInstallType", "TYPE_ENUM", false)],
        &["app_id"],
    )
}

/// File-backed schema: `chrome.users.WallpaperImage`.
pub fn wallpaper_schema() -> RawPolicySchema {
    raw_schema("chrome.users.WallpaperImage", &[("value", "TYPE_MESSAGE", false)], &[])
}

/// Builds a resolved policy from `(field, raw)` pairs.
pub fn resolved(schema: &str, values: &[(&str, Value)]) -> ResolvedPolicy {
    let mut value = Map::new();
    for (field, raw) in values {
        value.insert((*field).to_string(), raw.clone());
    }
    ResolvedPolicy {
        policy_schema: schema.to_string(),
        value,
    }
}
