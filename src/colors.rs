// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Terminal styling for the run banner

use colored::{ColoredString, Colorize};

/// Status indicators with consistent colors
pub struct Status;

impl Status {
    /// Success indicator: `[OK]` in green
    pub fn ok() -> ColoredString {
        "[OK]".green()
    }

    /// Warning indicator: `[!]` in yellow
    pub fn warn() -> ColoredString {
        "[!]".yellow()
    }

    /// Error indicator: `[X]` in red
    pub fn error() -> ColoredString {
        "[X]".red()
    }

    /// Summary indicator: `[=]` in blue
    pub fn summary() -> ColoredString {
        "[=]".blue()
    }
}

/// Create a simple separator line
pub fn line(width: usize) -> ColoredString {
    "=".repeat(width).dimmed()
}

/// Final line printed after all requested operations ran
pub fn banner(success: bool) -> String {
    if success {
        format!("{} {}", Status::ok(), "Run completed successfully".green().bold())
    } else {
        format!("{} {}", Status::error(), "Run completed with errors".red().bold())
    }
}
