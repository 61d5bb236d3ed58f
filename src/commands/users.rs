// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Users report command

use crate::client::transport::HttpTransport;
use crate::client::ApiClient;
use crate::config::AuditConfig;
use crate::error::Result;
use crate::output::{write_csv_replace, OutputPaths};
use crate::users::{SkuAllowList, UserReportBuilder};

/// Fetch users and replace `Copilot_Users.csv`. Returns `false` on failure.
pub fn run_users<T: HttpTransport>(
    client: &mut ApiClient<T>,
    config: &AuditConfig,
    paths: &OutputPaths,
) -> bool {
    match export_users(client, config, paths) {
        Ok(_) => true,
        Err(e) => {
            log::error!("Error retrieving users: {}", e);
            false
        }
    }
}

fn export_users<T: HttpTransport>(
    client: &mut ApiClient<T>,
    config: &AuditConfig,
    paths: &OutputPaths,
) -> Result<usize> {
    let skus = SkuAllowList::new(&config.copilot_sku_ids);
    let report = UserReportBuilder::new(client, skus).build()?;

    if report.users.is_empty() {
        log::warn!("No users retrieved; {} not written", paths.users_csv.display());
        return Ok(0);
    }

    write_csv_replace(&paths.users_csv, &report.users)?;
    let licensed = report.users.iter().filter(|u| u.has_copilot_license).count();
    log::info!(
        "Saved {} users ({} with Copilot license) to {}",
        report.users.len(),
        licensed,
        paths.users_csv.display()
    );
    Ok(report.users.len())
}
