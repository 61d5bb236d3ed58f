// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! CLI argument definitions using clap derive macros

use crate::commands::Selection;
use clap::Parser;
use std::path::PathBuf;

/// Retrieve Microsoft 365 Copilot users and interaction events into CSV reports
#[derive(Parser, Debug, Clone)]
#[command(name = "copilot-audit")]
#[command(author = "Nervosys")]
#[command(version)]
#[command(about = "Microsoft 365 Copilot audit data retrieval", long_about = None)]
pub struct Cli {
    /// Only retrieve user data
    #[arg(long)]
    pub users_only: bool,

    /// Only retrieve event data
    #[arg(long)]
    pub events_only: bool,

    /// Output directory for CSV files
    #[arg(long, default_value = "./output")]
    pub output_dir: PathBuf,

    /// Load environment variables from this file instead of ./.env
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Process log file
    #[arg(long, default_value = crate::logging::DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Log debug detail, including unresolved manager lookups
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn selection(&self) -> Selection {
        Selection::from_flags(self.users_only, self.events_only)
    }
}
