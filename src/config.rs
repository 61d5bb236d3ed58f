// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Environment-sourced configuration

use crate::error::{AuditError, Result};
use std::path::Path;

/// Commercial Microsoft 365 Copilot SKU
pub const DEFAULT_COPILOT_SKU_ID: &str = "639dec6b-bb19-468b-871c-c5c441c4b0cb";
pub const DEFAULT_LOOKBACK_DAYS: i64 = 90;
pub const DEFAULT_INTERVAL_MINUTES: i64 = 1440;

pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";
pub const MANAGEMENT_API_BASE: &str = "https://manage.office.com/api/v1.0";
pub const LOGIN_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Base URLs for the upstream services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub graph: String,
    pub management: String,
    pub authority: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            graph: GRAPH_API_BASE.to_string(),
            management: MANAGEMENT_API_BASE.to_string(),
            authority: LOGIN_AUTHORITY.to_string(),
        }
    }
}

/// App registration used for the client-credential flow
#[derive(Clone)]
pub struct ClientCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub credentials: ClientCredentials,
    /// SKU ids that count as a Copilot license
    pub copilot_sku_ids: Vec<String>,
    pub lookback_days: i64,
    pub interval_minutes: i64,
    pub endpoints: Endpoints,
}

impl AuditConfig {
    /// Load `.env` (or `env_file` when given) and read configuration from the process environment.
    pub fn from_env(env_file: Option<&Path>) -> Result<Self> {
        match env_file {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| AuditError::InvalidConfig {
                    key: "--env-file".to_string(),
                    value: format!("{}: {}", path.display(), e),
                })?;
            }
            None => {
                // A missing .env is normal when the variables are already exported
                dotenvy::dotenv().ok();
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let required = ["AZURE_TENANT_ID", "AZURE_CLIENT_ID", "AZURE_CLIENT_SECRET"];
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|key| get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(AuditError::MissingCredentials(missing.join(", ")));
        }

        let credentials = ClientCredentials {
            tenant_id: get("AZURE_TENANT_ID").unwrap_or_default(),
            client_id: get("AZURE_CLIENT_ID").unwrap_or_default(),
            client_secret: get("AZURE_CLIENT_SECRET").unwrap_or_default(),
        };

        let copilot_sku_ids = match get("COPILOT_SKU_IDS") {
            Some(raw) => parse_sku_list(&raw),
            None => vec![DEFAULT_COPILOT_SKU_ID.to_string()],
        };

        let lookback_days = parse_number(&get, "AUDIT_LOOKBACK_DAYS", DEFAULT_LOOKBACK_DAYS)?;
        let interval_minutes =
            parse_number(&get, "AUDIT_INTERVAL_MINUTES", DEFAULT_INTERVAL_MINUTES)?;
        if lookback_days < 0 {
            return Err(AuditError::InvalidConfig {
                key: "AUDIT_LOOKBACK_DAYS".to_string(),
                value: lookback_days.to_string(),
            });
        }
        if interval_minutes < 1 {
            return Err(AuditError::InvalidConfig {
                key: "AUDIT_INTERVAL_MINUTES".to_string(),
                value: interval_minutes.to_string(),
            });
        }

        let defaults = Endpoints::default();
        let endpoints = Endpoints {
            graph: get("COPILOT_AUDIT_GRAPH_BASE").unwrap_or(defaults.graph),
            management: get("COPILOT_AUDIT_MANAGEMENT_BASE").unwrap_or(defaults.management),
            authority: get("COPILOT_AUDIT_AUTHORITY").unwrap_or(defaults.authority),
        };

        Ok(Self {
            credentials,
            copilot_sku_ids,
            lookback_days,
            interval_minutes,
            endpoints,
        })
    }
}

/// Split a comma-separated SKU list, dropping blanks.
pub fn parse_sku_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_number<G>(get: &G, key: &str, default: i64) -> Result<i64>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| AuditError::InvalidConfig {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}
