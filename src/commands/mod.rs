// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Command implementations

mod events;
mod users;

pub use events::run_events;
pub use users::run_users;

use crate::client::transport::HttpTransport;
use crate::client::ApiClient;
use crate::config::AuditConfig;
use crate::output::{OutputPaths, ProgressSink};
use chrono::Utc;

/// Which top-level operations a run performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub users: bool,
    pub events: bool,
}

impl Selection {
    pub fn from_flags(users_only: bool, events_only: bool) -> Self {
        Self {
            users: !events_only,
            events: !users_only,
        }
    }
}

fn separator() {
    log::info!("{}", "=".repeat(60));
}

/// Run the selected operations in order. Both are attempted even if the first
/// fails; the result is `true` only if every attempted operation succeeded.
pub fn run_selected<T: HttpTransport>(
    client: &mut ApiClient<T>,
    config: &AuditConfig,
    paths: &OutputPaths,
    selection: Selection,
    progress: &mut dyn ProgressSink,
) -> bool {
    if !selection.users && !selection.events {
        log::warn!("--users-only and --events-only both given; nothing to do");
        return true;
    }

    let mut success = true;

    if selection.users {
        separator();
        log::info!("RETRIEVING COPILOT USERS");
        separator();
        success &= run_users(client, config, paths);
    }

    if selection.events {
        separator();
        log::info!("RETRIEVING COPILOT EVENTS");
        separator();
        success &= run_events(client, config, paths, progress, Utc::now());
    }

    separator();
    success
}
