// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Report files written to the output directory

use crate::error::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const USERS_CSV: &str = "Copilot_Users.csv";
pub const EVENTS_CSV: &str = "Copilot_Events.csv";
pub const AUDIT_LOG: &str = "AuditScriptLog.txt";

/// Locations of the three report files
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub dir: PathBuf,
    pub users_csv: PathBuf,
    pub events_csv: PathBuf,
    pub audit_log: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            users_csv: dir.join(USERS_CSV),
            events_csv: dir.join(EVENTS_CSV),
            audit_log: dir.join(AUDIT_LOG),
            dir,
        }
    }

    /// Create the output directory if needed.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }
}

fn writer_builder() -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder.terminator(csv::Terminator::CRLF);
    builder
}

/// Replace `path` with a CSV of `rows`, header taken from the row type's field order.
pub fn write_csv_replace<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = writer_builder().has_headers(true).from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Append `rows` to `path`. A new file gets a header; an existing one does not.
pub fn append_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let exists = path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = writer_builder().has_headers(!exists).from_writer(file);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Receives line-oriented progress notes during event collection
pub trait ProgressSink {
    fn note(&mut self, message: &str) -> Result<()>;
}

/// `AuditScriptLog.txt`: `<UTC ISO-8601>:<message>` lines, append-only
#[derive(Debug, Clone)]
pub struct AuditLogFile {
    path: PathBuf,
}

impl AuditLogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProgressSink for AuditLogFile {
    fn note(&mut self, message: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(
            file,
            "{}:{}",
            Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f"),
            message
        )?;
        Ok(())
    }
}

/// Collects notes in memory
#[derive(Debug, Default)]
pub struct MemoryProgress {
    pub lines: Vec<String>,
}

impl ProgressSink for MemoryProgress {
    fn note(&mut self, message: &str) -> Result<()> {
        self.lines.push(message.to_string());
        Ok(())
    }
}
