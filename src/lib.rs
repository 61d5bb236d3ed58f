// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Copilot Audit - Library
//!
//! Retrieves Microsoft 365 Copilot usage data for a tenant into CSV reports:
//!
//! - **Users** - every Entra ID user with a job title, their manager, and
//!   whether they hold a Copilot license (Microsoft Graph)
//! - **Events** - Copilot interaction records (audit RecordType 91) from the
//!   Office 365 Management Activity API, appended incrementally
//!
//! ```rust,ignore
//! use copilot_audit::{
//!     ApiClient, AuditConfig, HttpClientConfig, ReqwestTransport, SkuAllowList, UserReportBuilder,
//! };
//!
//! let config = AuditConfig::from_env(None)?;
//! let transport = ReqwestTransport::new(&HttpClientConfig::default())?;
//! let mut client = ApiClient::new(transport, &config);
//! let skus = SkuAllowList::new(&config.copilot_sku_ids);
//! let report = UserReportBuilder::new(&mut client, skus).build()?;
//! ```

pub mod cli;
pub mod client;
pub mod colors;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod output;
pub mod users;

// Re-export commonly used items
pub use cli::Cli;
pub use client::paging::{fetch_all, Paged};
pub use client::token::{Audience, TokenProvider};
pub use client::transport::{
    ApiRequest, HttpClientConfig, HttpResponse, HttpTransport, Method, ReqwestTransport,
};
pub use client::ApiClient;
pub use commands::{run_events, run_selected, run_users, Selection};
pub use config::AuditConfig;
pub use error::{AuditError, Result};
pub use events::{
    normalize_event, AuditWindowCollector, CopilotApp, CopilotEventRecord, CopilotLocation,
    ResumeCursor,
};
pub use output::{AuditLogFile, MemoryProgress, OutputPaths, ProgressSink};
pub use users::{SkuAllowList, UserRecord, UserReport, UserReportBuilder};
