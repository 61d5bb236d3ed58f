// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Client-credential token acquisition for Graph and the Management Activity API

use super::transport::{ApiRequest, HttpTransport};
use crate::config::ClientCredentials;
use crate::error::{AuditError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// API audience a token is issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Audience {
    Graph,
    Management,
}

impl Audience {
    pub fn scope(self) -> &'static str {
        match self {
            Audience::Graph => "https://graph.microsoft.com/.default",
            Audience::Management => "https://manage.office.com/.default",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Audience::Graph => write!(f, "Graph API"),
            Audience::Management => write!(f, "Management API"),
        }
    }
}

/// Tokens held for the lifetime of the process. There is no refresh: a new run
/// re-authenticates.
#[derive(Debug, Default)]
pub struct TokenCache {
    tokens: HashMap<Audience, String>,
}

impl TokenCache {
    pub fn get(&self, audience: Audience) -> Option<&str> {
        self.tokens.get(&audience).map(String::as_str)
    }

    pub fn insert(&mut self, audience: Audience, token: String) {
        self.tokens.insert(audience, token);
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug)]
pub struct TokenProvider {
    credentials: ClientCredentials,
    authority: String,
    cache: TokenCache,
}

impl TokenProvider {
    pub fn new(credentials: ClientCredentials, authority: &str) -> Self {
        Self {
            credentials,
            authority: authority.trim_end_matches('/').to_string(),
            cache: TokenCache::default(),
        }
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority, self.credentials.tenant_id
        )
    }

    /// Return the cached token for `audience`, exchanging client credentials on first use.
    pub fn get_token(
        &mut self,
        transport: &dyn HttpTransport,
        audience: Audience,
    ) -> Result<String> {
        if let Some(token) = self.cache.get(audience) {
            return Ok(token.to_string());
        }

        let request = ApiRequest::post(self.token_url()).form(&[
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", audience.scope()),
        ]);

        let auth_error = |reason: String| AuditError::Auth {
            audience: audience.to_string(),
            reason,
        };

        let response = transport
            .send(&request)
            .map_err(|e| auth_error(e.to_string()))?;
        let parsed: TokenResponse = response.json().map_err(|e| {
            auth_error(format!(
                "HTTP {}: invalid token response: {}",
                response.status, e
            ))
        })?;

        match parsed.access_token {
            Some(token) if response.is_success() && !token.is_empty() => {
                log::info!("Successfully acquired {} token", audience);
                self.cache.insert(audience, token.clone());
                Ok(token)
            }
            _ => {
                let reason = parsed
                    .error_description
                    .or(parsed.error)
                    .unwrap_or_else(|| "Unknown error".to_string());
                log::error!("Failed to acquire {} token: {}", audience, reason);
                Err(auth_error(reason))
            }
        }
    }
}
