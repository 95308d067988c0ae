// crates/policy-sync-http/src/client.rs
// ============================================================================
// Module: Chrome Policy HTTP Client
// Description: Blocking REST client implementing the core collaborator traits.
// Purpose: Carry schema, resolve, batch, ordering, upload, and etag reads over HTTPS.
// Dependencies: policy-sync-core, reqwest, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`ChromePolicyClient`] issues one bounded request per trait call and
//! classifies the outcome into [`ApiError`]; it never retries on its own.
//! Response bodies are read under a hard byte limit and redirects are not
//! followed. Policy files go through the media upload endpoint as a
//! `multipart/related` body: JSON metadata first, then the file bytes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use policy_sync_core::ApiError;
use policy_sync_core::ConditionalRead;
use policy_sync_core::GroupPriorityOrdering;
use policy_sync_core::ModifyRequest;
use policy_sync_core::PolicyDispatcher;
use policy_sync_core::PolicyFileUploader;
use policy_sync_core::PolicyRemoval;
use policy_sync_core::PolicyResolver;
use policy_sync_core::PriorityOrderingApi;
use policy_sync_core::RawPolicySchema;
use policy_sync_core::ResolvedPolicy;
use policy_sync_core::ResourceKind;
use policy_sync_core::ResourceReader;
use policy_sync_core::SchemaSource;
use policy_sync_core::TargetKey;
use policy_sync_core::TargetKind;
use policy_sync_core::content_sha256;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::RequestBuilder;
use reqwest::blocking::Response;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::IF_NONE_MATCH;
use reqwest::redirect::Policy;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::TokenSource;
use crate::config::ClientConfigError;
use crate::config::HttpClientConfig;
use crate::config::validate_base_url;
use crate::wire::BatchRequest;
use crate::wire::DirectoryResource;
use crate::wire::ErrorEnvelope;
use crate::wire::ModifyEntry;
use crate::wire::PriorityOrderingRequest;
use crate::wire::PriorityOrderingResponse;
use crate::wire::RemovalEntry;
use crate::wire::ResolveRequest;
use crate::wire::ResolveResponse;
use crate::wire::UploadPolicyFileRequest;
use crate::wire::UploadPolicyFileResponse;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Upper bound on resolve pages followed for one call.
const MAX_RESOLVE_PAGES: usize = 1_000;
/// Upper bound on raw error text carried into [`ApiError`] messages.
const MAX_ERROR_MESSAGE_BYTES: usize = 512;
/// Status returned for a conditional read whose etag still matches.
const STATUS_NOT_MODIFIED: u16 = 304;
/// Status returned for a missing resource.
const STATUS_NOT_FOUND: u16 = 404;
/// Status returned when throttled.
const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Upload protocol selected on the media endpoint.
const UPLOAD_TYPE_MULTIPART: &str = "multipart";

// ============================================================================
// SECTION: Client
// ============================================================================

/// Status code and body of a completed request.
struct RawResponse {
    /// HTTP status code.
    status: u16,
    /// Response body, bounded by the configured limit.
    body: Vec<u8>,
}

/// Blocking client for the browser policy and directory APIs.
pub struct ChromePolicyClient<T> {
    /// Client configuration.
    config: HttpClientConfig,
    /// Parsed policy API base URL.
    chrome_policy_base: Url,
    /// Parsed directory API base URL.
    directory_base: Url,
    /// Bearer token source.
    tokens: T,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl<T: TokenSource> ChromePolicyClient<T> {
    /// Creates a client after validating base URLs and limits.
    ///
    /// # Errors
    ///
    /// Returns [`ClientConfigError`] when a base URL is rejected, the customer
    /// id is empty, or the HTTP client cannot be created.
    pub fn new(config: HttpClientConfig, tokens: T) -> Result<Self, ClientConfigError> {
        if config.customer_id.trim().is_empty() {
            return Err(ClientConfigError::EmptyCustomer);
        }
        let chrome_policy_base = validate_base_url(&config.chrome_policy_base, config.allow_http)?;
        let directory_base = validate_base_url(&config.directory_base, config.allow_http)?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| ClientConfigError::Build(err.to_string()))?;
        Ok(Self {
            config,
            chrome_policy_base,
            directory_base,
            tokens,
            client,
        })
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Builds `{policy base}/v1/customers/{customer}/{tail...}`.
    fn policy_url(&self, tail: &[&str]) -> Result<Url, ApiError> {
        let mut segments = vec!["v1", "customers", self.config.customer_id.as_str()];
        segments.extend_from_slice(tail);
        join_segments(&self.chrome_policy_base, &segments)
    }

    /// Builds `{policy base}/upload/v1/customers/{customer}/{tail...}?uploadType=multipart`.
    fn upload_url(&self, tail: &[&str]) -> Result<Url, ApiError> {
        let mut segments = vec!["upload", "v1", "customers", self.config.customer_id.as_str()];
        segments.extend_from_slice(tail);
        let mut url = join_segments(&self.chrome_policy_base, &segments)?;
        url.query_pairs_mut().append_pair("uploadType", UPLOAD_TYPE_MULTIPART);
        Ok(url)
    }

    /// Builds the directory URL of a group or org unit.
    fn directory_url(&self, kind: ResourceKind, resource_id: &str) -> Result<Url, ApiError> {
        let segments = match kind {
            ResourceKind::Group => vec!["admin", "directory", "v1", "groups", resource_id],
            ResourceKind::OrgUnit => vec![
                "admin",
                "directory",
                "v1",
                "customer",
                self.config.customer_id.as_str(),
                "orgunits",
                resource_id,
            ],
        };
        join_segments(&self.directory_base, &segments)
    }

    /// Sends a request with credentials and reads the bounded body.
    fn execute(&self, builder: RequestBuilder, operation: &str) -> Result<RawResponse, ApiError> {
        let token = self.tokens.access_token()?;
        let mut response = builder
            .bearer_auth(token)
            .send()
            .map_err(|err| ApiError::Transport(format!("{operation}: {err}")))?;
        let status = response.status().as_u16();
        let body = read_response_limited(&mut response, self.config.max_response_bytes)?;
        debug!(operation, status, bytes = body.len(), "remote api call completed");
        Ok(RawResponse {
            status,
            body,
        })
    }

    /// Issues a GET and returns the success body.
    fn get(&self, url: Url, operation: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.execute(self.client.get(url), operation)?;
        expect_success(response)
    }

    /// Issues a JSON POST and returns the success body.
    fn post_json<B: Serialize>(
        &self,
        url: Url,
        body: &B,
        operation: &str,
    ) -> Result<Vec<u8>, ApiError> {
        let payload = serde_json::to_vec(body)
            .map_err(|err| ApiError::Malformed(format!("{operation}: {err}")))?;
        let builder =
            self.client.post(url).header(CONTENT_TYPE, "application/json").body(payload);
        let response = self.execute(builder, operation)?;
        expect_success(response)
    }
}

// ============================================================================
// SECTION: Collaborator Implementations
// ============================================================================

impl<T: TokenSource> SchemaSource for ChromePolicyClient<T> {
    fn get_schema(&self, schema_name: &str) -> Result<RawPolicySchema, ApiError> {
        let url = self.policy_url(&["policySchemas", schema_name])?;
        let body = self.get(url, "get policy schema")?;
        decode(&body, "get policy schema")
    }
}

impl<T: TokenSource> PolicyResolver for ChromePolicyClient<T> {
    fn resolve(
        &self,
        target: &TargetKey,
        schema_filter: &str,
    ) -> Result<Vec<ResolvedPolicy>, ApiError> {
        let url = self.policy_url(&["policies:resolve"])?;
        let mut resolved = Vec::new();
        let mut page_token: Option<String> = None;
        for _ in 0 .. MAX_RESOLVE_PAGES {
            let request = ResolveRequest {
                policy_schema_filter: schema_filter,
                policy_target_key: target,
                page_token: page_token.as_deref(),
            };
            let body = self.post_json(url.clone(), &request, "resolve policies")?;
            let page: ResolveResponse = decode(&body, "resolve policies")?;
            resolved.extend(page.resolved_policies.into_iter().map(|entry| ResolvedPolicy {
                policy_schema: entry.value.policy_schema,
                value: entry.value.value,
            }));
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(resolved),
            }
        }
        Err(ApiError::Malformed(format!("resolve policies: more than {MAX_RESOLVE_PAGES} pages")))
    }
}

impl<T: TokenSource> PolicyDispatcher for ChromePolicyClient<T> {
    fn batch_modify(&self, kind: TargetKind, requests: &[ModifyRequest]) -> Result<(), ApiError> {
        if requests.is_empty() {
            return Ok(());
        }
        let method = format!("{}:batchModify", kind.as_str());
        let url = self.policy_url(&["policies", &method])?;
        let body = BatchRequest {
            requests: requests.iter().map(ModifyEntry::from).collect(),
        };
        self.post_json(url, &body, &method).map(drop)
    }

    fn batch_delete(&self, removals: &[PolicyRemoval]) -> Result<(), ApiError> {
        self.post_removals("groups:batchDelete", removals)
    }

    fn batch_inherit(&self, removals: &[PolicyRemoval]) -> Result<(), ApiError> {
        self.post_removals("orgunits:batchInherit", removals)
    }
}

impl<T: TokenSource> ChromePolicyClient<T> {
    /// Posts a batch of removals to `policies/{method}`.
    fn post_removals(&self, method: &str, removals: &[PolicyRemoval]) -> Result<(), ApiError> {
        if removals.is_empty() {
            return Ok(());
        }
        let url = self.policy_url(&["policies", method])?;
        let body = BatchRequest {
            requests: removals.iter().map(RemovalEntry::from).collect(),
        };
        self.post_json(url, &body, method).map(drop)
    }
}

impl<T: TokenSource> PriorityOrderingApi for ChromePolicyClient<T> {
    fn update_group_priority_ordering(
        &self,
        ordering: &GroupPriorityOrdering,
    ) -> Result<(), ApiError> {
        let url = self.policy_url(&["policies", "groups:updateGroupPriorityOrdering"])?;
        let body = PriorityOrderingRequest {
            policy_target_key: &ordering.target_key,
            policy_schema: &ordering.policy_schema,
            policy_namespace: &ordering.policy_namespace,
            group_ids: Some(&ordering.group_ids),
        };
        self.post_json(url, &body, "update group priority ordering").map(drop)
    }

    fn list_group_priority_ordering(
        &self,
        target: &TargetKey,
        policy_schema: &str,
        policy_namespace: &str,
    ) -> Result<Vec<String>, ApiError> {
        let url = self.policy_url(&["policies", "groups:listGroupPriorityOrdering"])?;
        let body = PriorityOrderingRequest {
            policy_target_key: target,
            policy_schema,
            policy_namespace,
            group_ids: None,
        };
        let response = self.post_json(url, &body, "list group priority ordering")?;
        let ordering: PriorityOrderingResponse =
            decode(&response, "list group priority ordering")?;
        Ok(ordering.group_ids)
    }
}

impl<T: TokenSource> PolicyFileUploader for ChromePolicyClient<T> {
    fn upload_policy_file(
        &self,
        policy_field: &str,
        content_type: &str,
        content: &[u8],
    ) -> Result<String, ApiError> {
        let url = self.upload_url(&["policies", "files:uploadPolicyFile"])?;
        let metadata = serde_json::to_vec(&UploadPolicyFileRequest {
            policy_field,
        })
        .map_err(|err| ApiError::Malformed(format!("upload policy file: {err}")))?;
        let boundary = format!("policy-sync-{}", content_sha256(content));
        let body = multipart_related(&boundary, &metadata, content_type, content)?;
        let builder = self
            .client
            .post(url)
            .header(CONTENT_TYPE, format!("multipart/related; boundary={boundary}"))
            .body(body);
        let response = expect_success(self.execute(builder, "upload policy file")?)?;
        let uploaded: UploadPolicyFileResponse = decode(&response, "upload policy file")?;
        if uploaded.download_uri.is_empty() {
            return Err(ApiError::Malformed(
                "upload policy file: response carried no download uri".to_string(),
            ));
        }
        Ok(uploaded.download_uri)
    }
}

impl<T: TokenSource> ResourceReader for ChromePolicyClient<T> {
    fn get_if_none_match(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        etag: &str,
    ) -> Result<ConditionalRead, ApiError> {
        let url = self.directory_url(kind, resource_id)?;
        let mut builder = self.client.get(url);
        if !etag.is_empty() {
            builder = builder.header(IF_NONE_MATCH, etag);
        }
        let response = self.execute(builder, "conditional directory read")?;
        match response.status {
            STATUS_NOT_MODIFIED => Ok(ConditionalRead::NotModified),
            STATUS_NOT_FOUND => Ok(ConditionalRead::NotFound),
            _ => {
                let body = expect_success(response)?;
                let resource: DirectoryResource = decode(&body, "conditional directory read")?;
                Ok(ConditionalRead::Modified {
                    etag: resource.etag,
                })
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Appends path segments to a base URL, percent-encoding each.
fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ApiError::Malformed("base url cannot carry a path".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Assembles a two-part `multipart/related` body: JSON metadata, then media.
fn multipart_related(
    boundary: &str,
    metadata: &[u8],
    content_type: &str,
    content: &[u8],
) -> Result<Vec<u8>, ApiError> {
    let delimiter = format!("--{boundary}");
    if content.windows(delimiter.len()).any(|window| window == delimiter.as_bytes()) {
        return Err(ApiError::Malformed(
            "upload policy file: content contains the multipart boundary".to_string(),
        ));
    }
    let mut body = Vec::with_capacity(metadata.len().saturating_add(content.len()));
    body.extend_from_slice(
        format!("{delimiter}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(metadata);
    body.extend_from_slice(
        format!("\r\n{delimiter}\r\nContent-Type: {content_type}\r\n\r\n").as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n{delimiter}--\r\n").as_bytes());
    Ok(body)
}

/// Returns the body of a 2xx response or the classified error.
fn expect_success(response: RawResponse) -> Result<Vec<u8>, ApiError> {
    match classify_status(response.status, &response.body) {
        None => Ok(response.body),
        Some(err) => Err(err),
    }
}

/// Classifies a non-2xx status into an [`ApiError`]; returns `None` for success.
#[must_use]
pub fn classify_status(status: u16, body: &[u8]) -> Option<ApiError> {
    if (200 .. 300).contains(&status) {
        return None;
    }
    let message = error_message(status, body);
    Some(match status {
        STATUS_NOT_FOUND => ApiError::NotFound(message),
        STATUS_TOO_MANY_REQUESTS => ApiError::RateLimited(message),
        500 ..= 599 => ApiError::Unavailable(message),
        _ => ApiError::Rejected {
            status,
            message,
        },
    })
}

/// Extracts the API error message, falling back to truncated body text.
fn error_message(status: u16, body: &[u8]) -> String {
    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body)
        && !envelope.error.message.is_empty()
    {
        return envelope.error.message;
    }
    let text = body.get(.. MAX_ERROR_MESSAGE_BYTES).unwrap_or(body);
    let text = String::from_utf8_lossy(text);
    if text.trim().is_empty() { format!("http status {status}") } else { text.into_owned() }
}

/// Decodes a JSON body.
fn decode<D: DeserializeOwned>(body: &[u8], operation: &str) -> Result<D, ApiError> {
    serde_json::from_slice(body).map_err(|err| ApiError::Malformed(format!("{operation}: {err}")))
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, ApiError> {
    let expected_len = response.content_length();
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| ApiError::Malformed("response size limit exceeds u64".to_string()))?;
    if let Some(expected) = expected_len
        && expected > max_bytes_u64
    {
        return Err(ApiError::Malformed("http response exceeds size limit".to_string()));
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    response
        .take(limit)
        .read_to_end(&mut buf)
        .map_err(|err| ApiError::Transport(format!("failed to read response: {err}")))?;
    if buf.len() > max_bytes {
        return Err(ApiError::Malformed("http response exceeds size limit".to_string()));
    }
    Ok(buf)
}
