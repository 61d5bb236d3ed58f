// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Raw audit record shapes
//!
//! Audit records are loosely typed. Every field is optional and defaults when
//! absent or `null`, so a sparse record still normalizes.

use crate::error::{AuditError, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Office 365 Management Activity RecordType for Copilot interactions
pub const COPILOT_INTERACTION_RECORD_TYPE: i64 = 91;

/// Treat `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A record from a content blob or a unified audit log export
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuditRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub record_type: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub creation_time: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub creation_date: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: Option<String>,
    /// Nested audit payload, either an object or a JSON-encoded string
    #[serde(default)]
    pub audit_data: Option<Value>,
}

/// The Copilot-specific part of an audit record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuditPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub copilot_event_data: CopilotEventData,
    #[serde(default, deserialize_with = "null_as_default")]
    pub app_identity: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CopilotEventData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub contexts: Vec<EventContext>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub app_host: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub thread_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub accessed_resources: Vec<AccessedResource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventContext {
    #[serde(rename = "Type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccessedResource {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: String,
}

impl AuditRecord {
    pub fn from_value(raw: &Value) -> Result<Self> {
        Ok(Self::deserialize(raw)?)
    }

    pub fn is_copilot_interaction(&self) -> bool {
        self.record_type == Some(COPILOT_INTERACTION_RECORD_TYPE)
    }

    /// `CreationTime`, falling back to `CreationDate`
    pub fn created(&self) -> Option<&str> {
        self.creation_time
            .as_deref()
            .or(self.creation_date.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// Resolve the audit payload of `raw`.
///
/// `AuditData` may be a nested object or a JSON string; a record without it
/// (the Management API blob shape) carries the payload fields at the top level.
pub fn audit_payload(raw: &Value, record: &AuditRecord) -> Result<AuditPayload> {
    match &record.audit_data {
        Some(Value::String(encoded)) => Ok(serde_json::from_str(encoded)?),
        Some(Value::Null) => Ok(AuditPayload::default()),
        Some(nested @ Value::Object(_)) => Ok(AuditPayload::deserialize(nested)?),
        Some(other) => Err(AuditError::Parse(format!(
            "AuditData has unexpected type: {}",
            json_kind(other)
        ))),
        None => Ok(AuditPayload::deserialize(raw)?),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
