// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Authenticated access to Microsoft Graph and the Office 365 Management Activity API

pub mod paging;
pub mod token;
pub mod transport;

use crate::config::{AuditConfig, Endpoints};
use crate::error::Result;
use token::{Audience, TokenProvider};
use transport::{ApiRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// Owns the transport, the token cache and the upstream base URLs.
pub struct ApiClient<T: HttpTransport = ReqwestTransport> {
    transport: T,
    tokens: TokenProvider,
    endpoints: Endpoints,
    tenant_id: String,
}

impl<T: HttpTransport> ApiClient<T> {
    pub fn new(transport: T, config: &AuditConfig) -> Self {
        Self {
            transport,
            tokens: TokenProvider::new(
                config.credentials.clone(),
                &config.endpoints.authority,
            ),
            endpoints: config.endpoints.clone(),
            tenant_id: config.credentials.tenant_id.clone(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn token(&mut self, audience: Audience) -> Result<String> {
        self.tokens.get_token(&self.transport, audience)
    }

    /// Absolute URL for a Graph path; absolute links pass through unchanged.
    pub fn graph_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!(
                "{}/{}",
                self.endpoints.graph.trim_end_matches('/'),
                endpoint.trim_start_matches('/')
            )
        }
    }

    /// Base of the tenant's activity feed
    pub fn activity_feed_url(&self) -> String {
        format!(
            "{}/{}/activity/feed",
            self.endpoints.management.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// GET against Graph. Non-2xx statuses become [`crate::AuditError::Http`].
    pub fn graph_get(&mut self, endpoint: &str, query: &[(&str, &str)]) -> Result<HttpResponse> {
        let token = self.token(Audience::Graph)?;
        let url = self.graph_url(endpoint);
        let request = ApiRequest::get(&url)
            .query(query)
            .header("ConsistencyLevel", "eventual")
            .bearer(&token);
        self.transport.send(&request)?.error_for_status(&url)
    }

    /// Send a request to the Management API with its bearer token attached.
    /// The raw status is returned so callers can interpret 204 and 400.
    pub fn management_send(&mut self, request: ApiRequest) -> Result<HttpResponse> {
        let token = self.token(Audience::Management)?;
        self.transport.send(&request.bearer(&token))
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AuditConfig {
    use crate::config::ClientCredentials;

    AuditConfig {
        credentials: ClientCredentials {
            tenant_id: "contoso".to_string(),
            client_id: "app".to_string(),
            client_secret: "secret".to_string(),
        },
        copilot_sku_ids: vec![crate::config::DEFAULT_COPILOT_SKU_ID.to_string()],
        lookback_days: 90,
        interval_minutes: 1440,
        endpoints: Endpoints {
            graph: "https://graph.test/v1.0".to_string(),
            management: "https://manage.test/api/v1.0".to_string(),
            authority: "https://login.test".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::transport::testing::FakeTransport;
    use super::*;

    #[test]
    fn test_graph_url() {
        let client = ApiClient::new(FakeTransport::new(), &test_config());
        assert_eq!(client.graph_url("/users"), "https://graph.test/v1.0/users");
        assert_eq!(
            client.graph_url("https://graph.test/v1.0/users?$skiptoken=x"),
            "https://graph.test/v1.0/users?$skiptoken=x"
        );
    }

    #[test]
    fn test_activity_feed_url() {
        let client = ApiClient::new(FakeTransport::new(), &test_config());
        assert_eq!(
            client.activity_feed_url(),
            "https://manage.test/api/v1.0/contoso/activity/feed"
        );
    }

    #[test]
    fn test_graph_get_attaches_token_and_rejects_errors() {
        let transport = FakeTransport::new();
        transport.respond(
            "https://graph.test/v1.0/users/u1/manager",
            HttpResponse::new(404, r#"{"error":{"code":"Request_ResourceNotFound"}}"#),
        );
        let mut client = ApiClient::new(transport, &test_config());
        let err = client.graph_get("/users/u1/manager", &[]).unwrap_err();
        assert!(matches!(err, crate::AuditError::Http { status: 404, .. }));

        let sent = client.transport().get_requests();
        assert_eq!(sent[0].bearer.as_deref(), Some("test-token"));
    }
}
