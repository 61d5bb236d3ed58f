// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Error types for copilot-audit

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Authentication failed for {audience}: {reason}")]
    Auth { audience: String, reason: String },

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required environment variables: {0}")]
    MissingCredentials(String),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidConfig { key: String, value: String },
}

impl AuditError {
    /// True for token exchange failures, which end the operation that needed the token.
    pub fn is_auth(&self) -> bool {
        matches!(self, AuditError::Auth { .. })
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
