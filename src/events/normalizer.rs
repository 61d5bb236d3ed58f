// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Copilot interaction record normalization
//!
//! Maps one raw audit record onto the flat `Copilot_Events.csv` row. The app is
//! first guessed from the context type, then overridden by Teams links and the
//! `AppHost` field. Location is guessed from the context type and then
//! overridden by the shape of the context identifier.

use super::record::{audit_payload, AccessedResource, AuditRecord};
use crate::error::{AuditError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

pub const TEAMS_URL_PREFIX: &str = "https://teams.microsoft.com/";
pub const EVENT_TIMESTAMP_FORMAT: &str = "%d-%b-%Y %H:%M:%S";

/// Copilot surface an interaction happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CopilotApp {
    #[serde(rename = "Copilot for M365")]
    M365Copilot,
    Excel,
    Word,
    PowerPoint,
    Teams,
    Whiteboard,
    Loop,
    Stream,
    Outlook,
    #[serde(rename = "Copilot for M365 Chat")]
    M365Chat,
    #[serde(rename = "Copilot Studio Agent")]
    CopilotStudioAgent,
}

impl CopilotApp {
    pub fn as_str(self) -> &'static str {
        match self {
            CopilotApp::M365Copilot => "Copilot for M365",
            CopilotApp::Excel => "Excel",
            CopilotApp::Word => "Word",
            CopilotApp::PowerPoint => "PowerPoint",
            CopilotApp::Teams => "Teams",
            CopilotApp::Whiteboard => "Whiteboard",
            CopilotApp::Loop => "Loop",
            CopilotApp::Stream => "Stream",
            CopilotApp::Outlook => "Outlook",
            CopilotApp::M365Chat => "Copilot for M365 Chat",
            CopilotApp::CopilotStudioAgent => "Copilot Studio Agent",
        }
    }

    /// App implied by a context `Type`
    pub fn from_context_type(context_type: &str) -> Option<Self> {
        match context_type {
            "xlsx" => Some(CopilotApp::Excel),
            "docx" => Some(CopilotApp::Word),
            "pptx" => Some(CopilotApp::PowerPoint),
            "TeamsMeeting" => Some(CopilotApp::Teams),
            "whiteboard" => Some(CopilotApp::Whiteboard),
            "loop" => Some(CopilotApp::Loop),
            "StreamVideo" => Some(CopilotApp::Stream),
            _ => None,
        }
    }

    /// App named by the `AppHost` field
    pub fn from_app_host(app_host: &str) -> Option<Self> {
        match app_host {
            "bizchat" => Some(CopilotApp::M365Chat),
            "Outlook" => Some(CopilotApp::Outlook),
            "Copilot Studio" => Some(CopilotApp::CopilotStudioAgent),
            _ => None,
        }
    }
}

impl fmt::Display for CopilotApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the interaction's context lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CopilotLocation {
    #[serde(rename = "SharePoint Online")]
    SharePointOnline,
    #[serde(rename = "Teams Channel")]
    TeamsChannel,
    #[serde(rename = "Teams Chat")]
    TeamsChat,
    #[serde(rename = "OneDrive for Business")]
    OneDriveForBusiness,
    #[serde(rename = "Teams meeting")]
    TeamsMeeting,
    #[serde(rename = "Stream video player")]
    StreamVideoPlayer,
}

impl CopilotLocation {
    pub fn as_str(self) -> &'static str {
        match self {
            CopilotLocation::SharePointOnline => "SharePoint Online",
            CopilotLocation::TeamsChannel => "Teams Channel",
            CopilotLocation::TeamsChat => "Teams Chat",
            CopilotLocation::OneDriveForBusiness => "OneDrive for Business",
            CopilotLocation::TeamsMeeting => "Teams meeting",
            CopilotLocation::StreamVideoPlayer => "Stream video player",
        }
    }

    pub fn from_context_type(context_type: &str) -> Option<Self> {
        match context_type {
            "TeamsMeeting" => Some(CopilotLocation::TeamsMeeting),
            "StreamVideo" => Some(CopilotLocation::StreamVideoPlayer),
            _ => None,
        }
    }

    /// Location implied by the context identifier, if it is a recognizable URL
    pub fn from_context_id(context_id: &str) -> Option<Self> {
        if context_id.contains("/sites/") {
            Some(CopilotLocation::SharePointOnline)
        } else if is_teams_link(context_id) {
            if context_id.contains("ctx=channel") {
                Some(CopilotLocation::TeamsChannel)
            } else {
                Some(CopilotLocation::TeamsChat)
            }
        } else if context_id.contains("/personal/") {
            Some(CopilotLocation::OneDriveForBusiness)
        } else {
            None
        }
    }
}

impl fmt::Display for CopilotLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of `Copilot_Events.csv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopilotEventRecord {
    #[serde(rename = "TimeStamp")]
    pub timestamp: String,
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "App")]
    pub app: CopilotApp,
    #[serde(rename = "Location")]
    pub location: Option<CopilotLocation>,
    #[serde(rename = "App context")]
    pub app_context: String,
    #[serde(rename = "Accessed Resources")]
    pub accessed_resources: String,
    #[serde(rename = "Accessed Resource Locations")]
    pub accessed_resource_locations: String,
    #[serde(rename = "Action")]
    pub action: String,
    #[serde(rename = "AgentName")]
    pub agent_name: String,
}

pub const EVENT_CSV_HEADER: [&str; 9] = [
    "TimeStamp",
    "User",
    "App",
    "Location",
    "App context",
    "Accessed Resources",
    "Accessed Resource Locations",
    "Action",
    "AgentName",
];

fn is_teams_link(context_id: &str) -> bool {
    context_id.starts_with(TEAMS_URL_PREFIX)
}

/// Agent name from an `AppIdentity` such as `tenant_agent` or `bot-agent`
pub fn agent_name_from_identity(app_identity: &str) -> String {
    let separator = if app_identity.contains('_') {
        '_'
    } else if app_identity.contains('-') {
        '-'
    } else {
        return String::new();
    };
    app_identity
        .rsplit(separator)
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Reformat an ISO-8601 creation time as `05-Jan-2025 14:30:00`.
///
/// Offsets (including a trailing `Z`) are accepted; the wall-clock time in that
/// offset is kept rather than converted. A bare date means midnight.
pub fn format_event_timestamp(raw: &str) -> Result<String> {
    let naive = match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.naive_local(),
        Err(_) => match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        {
            Ok(naive) => naive,
            Err(e) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| AuditError::Parse(format!("invalid creation time {:?}: {}", raw, e)))?
                .and_time(NaiveTime::MIN),
        },
    };
    Ok(naive.format(EVENT_TIMESTAMP_FORMAT).to_string())
}

/// Deduplicate, sort and comma-join non-empty values.
fn join_sorted<'a, I>(values: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join(", ")
}

fn resource_columns(resources: &[AccessedResource]) -> (String, String, String) {
    (
        join_sorted(resources.iter().map(|r| r.name.as_str())),
        join_sorted(resources.iter().map(|r| r.id.as_str())),
        join_sorted(resources.iter().map(|r| r.action.as_str())),
    )
}

/// Normalize a raw audit record, failing on malformed payloads or timestamps.
pub fn try_normalize(raw: &Value) -> Result<CopilotEventRecord> {
    let record = AuditRecord::from_value(raw)?;
    let payload = audit_payload(raw, &record)?;
    let event = &payload.copilot_event_data;

    let (context_type, context_id) = event
        .contexts
        .first()
        .map(|c| (c.kind.as_str(), c.id.as_str()))
        .unwrap_or(("", ""));

    let mut app = CopilotApp::from_context_type(context_type).unwrap_or(CopilotApp::M365Copilot);
    let mut location = CopilotLocation::from_context_type(context_type);

    if is_teams_link(context_id) {
        app = CopilotApp::Teams;
    } else if let Some(host_app) = CopilotApp::from_app_host(&event.app_host) {
        app = host_app;
    }

    let app_context = if context_id.is_empty() {
        event.thread_id.clone()
    } else {
        context_id.to_string()
    };

    let agent_name = if app == CopilotApp::CopilotStudioAgent {
        agent_name_from_identity(&payload.app_identity)
    } else {
        String::new()
    };

    if let Some(from_id) = CopilotLocation::from_context_id(context_id) {
        location = Some(from_id);
    }

    let (accessed_resources, accessed_resource_locations, action) =
        resource_columns(&event.accessed_resources);

    let timestamp = match record.created() {
        Some(created) => format_event_timestamp(created)?,
        None => String::new(),
    };

    Ok(CopilotEventRecord {
        timestamp,
        user: record.user_id.clone().unwrap_or_default(),
        app,
        location,
        app_context,
        accessed_resources,
        accessed_resource_locations,
        action,
        agent_name,
    })
}

/// Normalize a raw audit record; malformed records are logged and yield `None`.
pub fn normalize_event(raw: &Value) -> Option<CopilotEventRecord> {
    match try_normalize(raw) {
        Ok(event) => Some(event),
        Err(e) => {
            log::error!("Error parsing event: {}", e);
            None
        }
    }
}
