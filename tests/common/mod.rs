//! Shared helpers for integration tests

#![allow(dead_code)]

use copilot_audit::config::{ClientCredentials, Endpoints};
use copilot_audit::{ApiRequest, AuditConfig, HttpResponse, HttpTransport, Result};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

pub const GRAPH: &str = "https://graph.test/v1.0";
pub const FEED: &str = "https://manage.test/api/v1.0/contoso/activity/feed";
pub const TOKEN_URL: &str = "https://login.test/contoso/oauth2/v2.0/token";

pub fn test_config() -> AuditConfig {
    AuditConfig {
        credentials: ClientCredentials {
            tenant_id: "contoso".to_string(),
            client_id: "app".to_string(),
            client_secret: "secret".to_string(),
        },
        copilot_sku_ids: vec![copilot_audit::config::DEFAULT_COPILOT_SKU_ID.to_string()],
        lookback_days: 1,
        interval_minutes: 1440,
        endpoints: Endpoints {
            graph: GRAPH.to_string(),
            management: "https://manage.test/api/v1.0".to_string(),
            authority: "https://login.test".to_string(),
        },
    }
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).unwrap()
}

/// In-memory transport answering by exact URL. Queued responses are used in
/// order, the last one repeats. Token requests succeed unless routed.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: RefCell<HashMap<String, VecDeque<HttpResponse>>>,
    pub requests: RefCell<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, status: u16, body: &str) -> &Self {
        self.respond_full(url, HttpResponse::new(status, body))
    }

    pub fn respond_full(&self, url: &str, response: HttpResponse) -> &Self {
        self.routes
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn requests_to(&self, url: &str) -> Vec<ApiRequest> {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.url == url)
            .cloned()
            .collect()
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(&self, request: &ApiRequest) -> Result<HttpResponse> {
        self.requests.borrow_mut().push(request.clone());
        let mut routes = self.routes.borrow_mut();
        let response = match routes.get_mut(&request.url) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        Ok(response.unwrap_or_else(|| {
            if request.url.ends_with("/oauth2/v2.0/token") {
                HttpResponse::new(200, r#"{"access_token":"test-token"}"#)
            } else {
                HttpResponse::new(404, "")
            }
        }))
    }
}
