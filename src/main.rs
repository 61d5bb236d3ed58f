// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Copilot Audit - Main entry point
//!
//! Pulls Copilot users and interaction events for one tenant into CSV files.

use clap::Parser;
use copilot_audit::colors::{self, Status};
use copilot_audit::commands;
use copilot_audit::{
    logging, ApiClient, AuditConfig, AuditLogFile, Cli, HttpClientConfig, OutputPaths,
    ReqwestTransport,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_file, cli.verbose) {
        eprintln!("{} {:#}", Status::error(), e);
        return ExitCode::FAILURE;
    }

    let config = match AuditConfig::from_env(cli.env_file.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let paths = OutputPaths::new(&cli.output_dir);
    if let Err(e) = paths.ensure_dir() {
        log::error!(
            "Could not create output directory {}: {}",
            paths.dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let transport = match ReqwestTransport::new(&HttpClientConfig::default()) {
        Ok(transport) => transport,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let mut client = ApiClient::new(transport, &config);
    let mut progress = AuditLogFile::new(&paths.audit_log);

    let selection = cli.selection();
    if !selection.users && !selection.events {
        println!(
            "{} --users-only and --events-only cancel each other; nothing retrieved",
            Status::warn()
        );
    }

    let success = commands::run_selected(&mut client, &config, &paths, selection, &mut progress);

    println!("{}", colors::line(60));
    println!(
        "{} Output directory: {}",
        Status::summary(),
        paths.dir.display()
    );
    println!("{}", colors::banner(success));

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
