// crates/policy-sync-http/tests/common/mod.rs
// ============================================================================
// Module: HTTP Test Fixtures
// Description: Scripted loopback server capturing inbound requests.
// Purpose: Let client tests assert paths, headers, and bodies.
// Dependencies: policy-sync-http, tiny_http
// ============================================================================

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

use std::thread;
use std::time::Duration;

use policy_sync_http::ChromePolicyClient;
use policy_sync_http::HttpClientConfig;
use policy_sync_http::StaticToken;
use serde_json::Value;
use tiny_http::Response;
use tiny_http::Server;

/// Customer id used by every fixture client.
pub const CUSTOMER: &str = "C01";

/// Request observed by the scripted server.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    /// Returns the first header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Canned response served in order.
pub struct Scripted {
    status: u16,
    body: String,
}

pub fn reply(status: u16, body: impl Into<String>) -> Scripted {
    Scripted {
        status,
        body: body.into(),
    }
}

pub fn ok_json(body: &Value) -> Scripted {
    reply(200, body.to_string())
}

/// Loopback server answering a fixed script, then stopping.
pub struct ScriptedServer {
    base: String,
    handle: thread::JoinHandle<Vec<CapturedRequest>>,
}

impl ScriptedServer {
    pub fn start(script: Vec<Scripted>) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let handle = thread::spawn(move || {
            let mut captured = Vec::new();
            for scripted in script {
                let Ok(Some(mut request)) = server.recv_timeout(Duration::from_secs(5)) else {
                    break;
                };
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                captured.push(CapturedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_string(),
                    headers: request
                        .headers()
                        .iter()
                        .map(|header| (header.field.to_string(), header.value.to_string()))
                        .collect(),
                    body,
                });
                let response =
                    Response::from_string(scripted.body).with_status_code(scripted.status);
                let _ = request.respond(response);
            }
            captured
        });
        Self {
            base: format!("http://{addr}"),
            handle,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Config pointing both API hosts at this server.
    pub fn config(&self) -> HttpClientConfig {
        HttpClientConfig {
            customer_id: CUSTOMER.to_string(),
            chrome_policy_base: self.base.clone(),
            directory_base: self.base.clone(),
            allow_http: true,
            timeout_ms: 5_000,
            ..HttpClientConfig::default()
        }
    }

    pub fn client(&self) -> ChromePolicyClient<StaticToken> {
        ChromePolicyClient::new(self.config(), StaticToken::new("test-token")).unwrap()
    }

    /// Waits for the script to finish and returns the captured requests.
    pub fn finish(self) -> Vec<CapturedRequest> {
        self.handle.join().unwrap()
    }
}
