// crates/policy-sync-http/tests/client.rs
// ============================================================================
// Module: Chrome Policy Client Tests
// Description: Request shapes, status classification, and body limits.
// Purpose: Pin the REST contract of every collaborator trait implementation.
// Dependencies: policy-sync-core, policy-sync-http, tiny_http
// ============================================================================

//! ## Overview
//! Each test scripts a loopback server, drives one client call, and asserts
//! both the outbound request and the classified result.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use policy_sync_core::AdditionalKeyBinding;
use policy_sync_core::ApiError;
use policy_sync_core::ConditionalRead;
use policy_sync_core::EngineConfig;
use policy_sync_core::GroupPriorityOrdering;
use policy_sync_core::ModifyRequest;
use policy_sync_core::PolicyAssignment;
use policy_sync_core::PolicyDispatcher;
use policy_sync_core::PolicyEngine;
use policy_sync_core::PolicyFileUploader;
use policy_sync_core::PolicyRemoval;
use policy_sync_core::PolicyResolver;
use policy_sync_core::PolicyTarget;
use policy_sync_core::PriorityOrderingApi;
use policy_sync_core::ResourceKind;
use policy_sync_core::ResourceReader;
use policy_sync_core::RetryPolicy;
use policy_sync_core::SchemaSource;
use policy_sync_core::SystemClock;
use policy_sync_core::TargetKey;
use policy_sync_core::TargetKind;
use policy_sync_core::content_sha256;
use policy_sync_http::ChromePolicyClient;
use policy_sync_http::ClientConfigError;
use policy_sync_http::HttpClientConfig;
use policy_sync_http::StaticToken;
use policy_sync_http::classify_status;
use serde_json::Map;
use serde_json::json;

use crate::common::ScriptedServer;
use crate::common::ok_json;
use crate::common::reply;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn max_connections_schema_json() -> serde_json::Value {
    json!({
        "name": "customers/C01/policySchemas/chrome.users.MaxConnectionsPerProxy",
        "schemaName": "chrome.users.MaxConnectionsPerProxy",
        "definition": {
            "messageType": [{
                "name": "MaxConnectionsPerProxy",
                "field": [{
                    "name": "maxConnectionsPerProxy",
                    "type": "TYPE_INT64",
                    "label": "LABEL_OPTIONAL"
                }]
            }]
        }
    })
}

fn ou_modify() -> ModifyRequest {
    let mut value = Map::new();
    value.insert("maxConnectionsPerProxy".to_string(), json!(32));
    ModifyRequest {
        target_key: TargetKey::new(TargetKind::OrgUnit, "id:04fatzly"),
        policy_schema: "chrome.users.MaxConnectionsPerProxy".to_string(),
        value,
        update_mask: vec!["maxConnectionsPerProxy".to_string()],
    }
}

// ============================================================================
// SECTION: Construction
// ============================================================================

#[test]
fn new_rejects_cleartext_without_opt_in() {
    let config = HttpClientConfig {
        chrome_policy_base: "http://127.0.0.1:9".to_string(),
        ..HttpClientConfig::default()
    };
    let Err(err) = ChromePolicyClient::new(config, StaticToken::new("t")) else {
        panic!("expected cleartext base to be rejected");
    };
    assert!(matches!(err, ClientConfigError::UnsupportedScheme(_)));
}

#[test]
fn new_rejects_empty_customer() {
    let config = HttpClientConfig {
        customer_id: "  ".to_string(),
        ..HttpClientConfig::default()
    };
    let Err(err) = ChromePolicyClient::new(config, StaticToken::new("t")) else {
        panic!("expected empty customer to be rejected");
    };
    assert_eq!(err, ClientConfigError::EmptyCustomer);
}

// ============================================================================
// SECTION: Schemas and Resolve
// ============================================================================

#[test]
fn get_schema_requests_customer_scoped_path_with_bearer_token() {
    let server = ScriptedServer::start(vec![ok_json(&max_connections_schema_json())]);
    let client = server.client();
    let raw = client.get_schema("chrome.users.MaxConnectionsPerProxy").unwrap();
    assert_eq!(raw.schema_name, "chrome.users.MaxConnectionsPerProxy");

    let requests = server.finish();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].url, "/v1/customers/C01/policySchemas/chrome.users.MaxConnectionsPerProxy");
    assert_eq!(requests[0].header("Authorization"), Some("Bearer test-token"));
}

#[test]
fn get_schema_maps_missing_schema_to_not_found() {
    let server = ScriptedServer::start(vec![reply(
        404,
        json!({"error": {"code": 404, "message": "schema not found"}}).to_string(),
    )]);
    let err = server.client().get_schema("chrome.users.Nope").unwrap_err();
    assert_eq!(err, ApiError::NotFound("schema not found".to_string()));
    server.finish();
}

#[test]
fn resolve_follows_page_tokens() {
    let server = ScriptedServer::start(vec![
        ok_json(&json!({
            "resolvedPolicies": [{
                "value": {"policySchema": "chrome.users.A", "value": {"enabled": true}}
            }],
            "nextPageToken": "page-2"
        })),
        ok_json(&json!({
            "resolvedPolicies": [{
                "value": {"policySchema": "chrome.users.B", "value": {"count": "3"}}
            }]
        })),
    ]);
    let target = TargetKey::new(TargetKind::OrgUnit, "ou");
    let resolved = server.client().resolve(&target, "chrome.users.*").unwrap();
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0].policy_schema, "chrome.users.A");
    assert_eq!(resolved[1].value.get("count"), Some(&json!("3")));

    let requests = server.finish();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, "/v1/customers/C01/policies:resolve");
    assert_eq!(
        requests[0].json(),
        json!({
            "policySchemaFilter": "chrome.users.*",
            "policyTargetKey": {"targetResource": "orgunits/ou"}
        })
    );
    assert_eq!(requests[1].json()["pageToken"], json!("page-2"));
}

// ============================================================================
// SECTION: Batch Writes
// ============================================================================

#[test]
fn batch_modify_posts_kind_scoped_body() {
    let server = ScriptedServer::start(vec![ok_json(&json!({}))]);
    server.client().batch_modify(TargetKind::OrgUnit, &[ou_modify()]).unwrap();

    let requests = server.finish();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].url, "/v1/customers/C01/policies/orgunits:batchModify");
    assert_eq!(
        requests[0].json(),
        json!({
            "requests": [{
                "policyTargetKey": {"targetResource": "orgunits/04fatzly"},
                "policyValue": {
                    "policySchema": "chrome.users.MaxConnectionsPerProxy",
                    "value": {"maxConnectionsPerProxy": 32}
                },
                "updateMask": "maxConnectionsPerProxy"
            }]
        })
    );
}

#[test]
fn removals_use_delete_for_groups_and_inherit_for_org_units() {
    let server = ScriptedServer::start(vec![ok_json(&json!({})), ok_json(&json!({}))]);
    let client = server.client();
    let group_key = TargetKey::new(TargetKind::Group, "g1")
        .with_binding(&AdditionalKeyBinding::new("app_id", "chrome:aaa"));
    client
        .batch_delete(&[PolicyRemoval {
            target_key: group_key,
            policy_schema: "chrome.users.apps.InstallType".to_string(),
        }])
        .unwrap();
    client
        .batch_inherit(&[PolicyRemoval {
            target_key: TargetKey::new(TargetKind::OrgUnit, "ou"),
            policy_schema: "chrome.users.MaxConnectionsPerProxy".to_string(),
        }])
        .unwrap();

    let requests = server.finish();
    assert_eq!(requests[0].url, "/v1/customers/C01/policies/groups:batchDelete");
    assert_eq!(
        requests[0].json()["requests"][0]["policyTargetKey"],
        json!({"targetResource": "groups/g1", "additionalTargetKeys": {"app_id": "chrome:aaa"}})
    );
    assert_eq!(requests[1].url, "/v1/customers/C01/policies/orgunits:batchInherit");
}

#[test]
fn empty_batches_send_nothing() {
    let server = ScriptedServer::start(Vec::new());
    let client = server.client();
    client.batch_modify(TargetKind::Group, &[]).unwrap();
    client.batch_delete(&[]).unwrap();
    client.batch_inherit(&[]).unwrap();
    assert!(server.finish().is_empty());
}

#[test]
fn rejected_write_carries_api_message() {
    let server = ScriptedServer::start(vec![reply(
        400,
        json!({"error": {"code": 400, "message": "Invalid value for maxConnectionsPerProxy"}})
            .to_string(),
    )]);
    let err = server.client().batch_modify(TargetKind::OrgUnit, &[ou_modify()]).unwrap_err();
    assert_eq!(
        err,
        ApiError::Rejected {
            status: 400,
            message: "Invalid value for maxConnectionsPerProxy".to_string(),
        }
    );
    server.finish();
}

#[test]
fn app_not_installed_rejection_is_recognized() {
    let server = ScriptedServer::start(vec![reply(
        400,
        json!({"error": {"message": "apps are not installed: chrome:aaa"}}).to_string(),
    )]);
    let err = server.client().batch_delete(&[PolicyRemoval {
        target_key: TargetKey::new(TargetKind::Group, "g1"),
        policy_schema: "chrome.users.apps.InstallType".to_string(),
    }]);
    assert!(err.unwrap_err().is_app_not_installed());
    server.finish();
}

// ============================================================================
// SECTION: Priority Ordering
// ============================================================================

#[test]
fn priority_ordering_update_and_list() {
    let server = ScriptedServer::start(vec![
        ok_json(&json!({})),
        ok_json(&json!({"groupIds": ["g2", "g1"]})),
    ]);
    let client = server.client();
    let target_key = TargetKey::new(TargetKind::OrgUnit, "ou")
        .with_binding(&AdditionalKeyBinding::new("app_id", "chrome:aaa"));
    client
        .update_group_priority_ordering(&GroupPriorityOrdering {
            target_key: target_key.clone(),
            policy_schema: "chrome.users.apps.InstallType".to_string(),
            policy_namespace: "chrome.users.apps".to_string(),
            group_ids: vec!["g2".to_string(), "g1".to_string()],
        })
        .unwrap();
    let ids = client
        .list_group_priority_ordering(
            &target_key,
            "chrome.users.apps.InstallType",
            "chrome.users.apps",
        )
        .unwrap();
    assert_eq!(ids, vec!["g2".to_string(), "g1".to_string()]);

    let requests = server.finish();
    assert_eq!(requests[0].url, "/v1/customers/C01/policies/groups:updateGroupPriorityOrdering");
    assert_eq!(requests[0].json()["groupIds"], json!(["g2", "g1"]));
    assert_eq!(requests[1].url, "/v1/customers/C01/policies/groups:listGroupPriorityOrdering");
    assert!(requests[1].json().get("groupIds").is_none());
}

// ============================================================================
// SECTION: Policy Files
// ============================================================================

#[test]
fn upload_sends_multipart_related_body() {
    let server = ScriptedServer::start(vec![ok_json(
        &json!({"downloadUri": "https://storage.example/wallpaper-1"}),
    )]);
    let content = b"fake jpeg bytes";
    let uri = server
        .client()
        .upload_policy_file("chrome.users.WallpaperImage.value", "image/jpeg", content)
        .unwrap();
    assert_eq!(uri, "https://storage.example/wallpaper-1");

    let requests = server.finish();
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(
        request.url,
        "/upload/v1/customers/C01/policies/files:uploadPolicyFile?uploadType=multipart"
    );
    assert_eq!(request.header("Authorization"), Some("Bearer test-token"));
    let boundary = format!("policy-sync-{}", content_sha256(content));
    assert_eq!(
        request.header("Content-Type"),
        Some(format!("multipart/related; boundary={boundary}").as_str())
    );
    let expected = format!(
        "--{boundary}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n\
         {{\"policyField\":\"chrome.users.WallpaperImage.value\"}}\r\n\
         --{boundary}\r\nContent-Type: image/jpeg\r\n\r\n\
         fake jpeg bytes\r\n--{boundary}--\r\n"
    );
    assert_eq!(request.body, expected);
}

#[test]
fn upload_without_download_uri_is_malformed() {
    let server = ScriptedServer::start(vec![ok_json(&json!({}))]);
    let err = server
        .client()
        .upload_policy_file("chrome.users.WallpaperImage.value", "image/png", b"png")
        .unwrap_err();
    assert!(matches!(err, ApiError::Malformed(_)));
    server.finish();
}

#[test]
fn engine_uploads_wallpaper_through_client() {
    let server = ScriptedServer::start(vec![
        ok_json(&json!({
            "schemaName": "chrome.users.WallpaperImage",
            "definition": {
                "messageType": [{
                    "name": "WallpaperImage",
                    "field": [{"name": "value", "type": "TYPE_MESSAGE", "label": "LABEL_OPTIONAL"}]
                }]
            }
        })),
        reply(503, ""),
        ok_json(&json!({"downloadUri": "https://storage.example/wallpaper-2"})),
    ]);
    let config = EngineConfig {
        api_retry: RetryPolicy::fixed(Duration::from_secs(5), Duration::from_millis(10)),
        ..EngineConfig::default()
    };
    let engine = PolicyEngine::new(server.client(), SystemClock, config);
    let uploaded = engine
        .upload_policy_file("chrome.users.WallpaperImage.value", "wallpaper.png", b"png bytes")
        .unwrap();
    assert_eq!(uploaded.download_uri, "https://storage.example/wallpaper-2");
    assert_eq!(uploaded.content_type, "image/png");
    assert!(uploaded.matches_content(b"png bytes"));

    let requests = server.finish();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].url, "/v1/customers/C01/policySchemas/chrome.users.WallpaperImage");
    assert!(requests[2].url.starts_with("/upload/v1/customers/C01/policies/files:uploadPolicyFile"));
}

// ============================================================================
// SECTION: Conditional Reads
// ============================================================================

#[test]
fn conditional_read_sends_etag_and_maps_not_modified() {
    let server = ScriptedServer::start(vec![reply(304, "")]);
    let read = server.client().get_if_none_match(ResourceKind::Group, "g1", "\"etag-1\"").unwrap();
    assert_eq!(read, ConditionalRead::NotModified);

    let requests = server.finish();
    assert_eq!(requests[0].url, "/admin/directory/v1/groups/g1");
    assert_eq!(requests[0].header("If-None-Match"), Some("\"etag-1\""));
}

#[test]
fn conditional_read_without_etag_returns_new_tag() {
    let server = ScriptedServer::start(vec![
        ok_json(&json!({"etag": "\"etag-2\"", "orgUnitPath": "/Sales"})),
        reply(404, ""),
    ]);
    let client = server.client();
    let read = client.get_if_none_match(ResourceKind::OrgUnit, "id:04fatzly", "").unwrap();
    assert_eq!(
        read,
        ConditionalRead::Modified {
            etag: "\"etag-2\"".to_string(),
        }
    );
    let missing = client.get_if_none_match(ResourceKind::Group, "gone", "").unwrap();
    assert_eq!(missing, ConditionalRead::NotFound);

    let requests = server.finish();
    assert_eq!(requests[0].url, "/admin/directory/v1/customer/C01/orgunits/id:04fatzly");
    assert!(requests[0].header("If-None-Match").is_none());
}

// ============================================================================
// SECTION: Limits and Credentials
// ============================================================================

#[test]
fn oversized_body_is_rejected() {
    let server = ScriptedServer::start(vec![reply(200, "x".repeat(64))]);
    let config = HttpClientConfig {
        max_response_bytes: 16,
        ..server.config()
    };
    let client = ChromePolicyClient::new(config, StaticToken::new("t")).unwrap();
    let err = client.get_schema("chrome.users.Big").unwrap_err();
    assert!(matches!(err, ApiError::Malformed(_)));
    server.finish();
}

#[test]
fn undecodable_body_is_malformed() {
    let server = ScriptedServer::start(vec![reply(200, "not json")]);
    let err = server.client().get_schema("chrome.users.Broken").unwrap_err();
    assert!(matches!(err, ApiError::Malformed(_)));
    server.finish();
}

#[test]
fn empty_token_fails_before_any_request() {
    let server = ScriptedServer::start(Vec::new());
    let client = ChromePolicyClient::new(server.config(), StaticToken::new("")).unwrap();
    let err = client.get_schema("chrome.users.A").unwrap_err();
    assert!(matches!(err, ApiError::Credentials(_)));
    assert!(server.finish().is_empty());
}

#[test]
fn status_classification_table() {
    assert!(classify_status(200, b"").is_none());
    assert!(classify_status(204, b"").is_none());
    assert!(matches!(classify_status(404, b""), Some(ApiError::NotFound(_))));
    assert!(matches!(classify_status(429, b""), Some(ApiError::RateLimited(_))));
    assert!(matches!(classify_status(503, b"busy"), Some(ApiError::Unavailable(message)) if message == "busy"));
    assert!(matches!(
        classify_status(403, b""),
        Some(ApiError::Rejected { status: 403, message }) if message == "http status 403"
    ));
    assert!(classify_status(503, b"").unwrap().is_transient());
    assert!(!classify_status(400, b"").unwrap().is_transient());
}

// ============================================================================
// SECTION: Engine Over HTTP
// ============================================================================

#[test]
fn engine_applies_and_reads_back_through_client() {
    let server = ScriptedServer::start(vec![
        ok_json(&max_connections_schema_json()),
        ok_json(&json!({})),
        ok_json(&json!({
            "resolvedPolicies": [{
                "value": {
                    "policySchema": "chrome.users.MaxConnectionsPerProxy",
                    "value": {"maxConnectionsPerProxy": "32"}
                }
            }]
        })),
        ok_json(&max_connections_schema_json()),
    ]);
    let engine = PolicyEngine::new(server.client(), SystemClock, EngineConfig::default());
    let target = PolicyTarget::new(TargetKind::OrgUnit, "04fatzly");
    let mut values = BTreeMap::new();
    values.insert("maxConnectionsPerProxy".to_string(), json!(32));
    let assignment = PolicyAssignment::new("chrome.users.MaxConnectionsPerProxy", values);

    let units = engine.plan_and_apply(&target, std::slice::from_ref(&assignment)).unwrap();
    assert_eq!(units, 1);
    let read = engine
        .read_and_decode(&target, &["chrome.users.MaxConnectionsPerProxy".to_string()])
        .unwrap();
    assert_eq!(read, vec![assignment]);

    let requests = server.finish();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[1].url, "/v1/customers/C01/policies/orgunits:batchModify");
    assert_eq!(requests[2].url, "/v1/customers/C01/policies:resolve");
}
