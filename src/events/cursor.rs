// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Resume point for incremental event collection

use super::normalizer::EVENT_TIMESTAMP_FORMAT;
use crate::error::{AuditError, Result};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorSource {
    /// Timestamp of the last row already in the events CSV
    LastEvent,
    /// No usable events CSV; `now - lookback`
    Lookback,
}

/// Where the next collection run starts. Derived from the events CSV on every
/// run, never stored separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeCursor {
    pub start: DateTime<Utc>,
    pub source: CursorSource,
}

impl ResumeCursor {
    /// Fails only when `now - lookback_days` is out of range and the lookback is needed.
    pub fn from_events_csv(path: &Path, lookback_days: i64, now: DateTime<Utc>) -> Result<Self> {
        if path.exists() {
            match last_event_timestamp(path) {
                Ok(Some(start)) => {
                    return Ok(Self {
                        start,
                        source: CursorSource::LastEvent,
                    })
                }
                Ok(None) => {}
                Err(e) => log::warn!("Could not parse last event timestamp: {}", e),
            }
        }
        Self::lookback(lookback_days, now)
    }

    fn lookback(lookback_days: i64, now: DateTime<Utc>) -> Result<Self> {
        let start = Duration::try_days(lookback_days)
            .and_then(|days| now.checked_sub_signed(days))
            .ok_or_else(|| AuditError::InvalidConfig {
                key: "AUDIT_LOOKBACK_DAYS".to_string(),
                value: lookback_days.to_string(),
            })?;
        Ok(Self {
            start,
            source: CursorSource::Lookback,
        })
    }
}

/// First column of the last data row, read as a UTC `dd-Mon-yyyy HH:MM:SS` timestamp.
fn last_event_timestamp(path: &Path) -> Result<Option<DateTime<Utc>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut last = None;
    for record in reader.records() {
        last = Some(record?);
    }

    let Some(last) = last else {
        return Ok(None);
    };
    let first = last.get(0).unwrap_or_default();
    let parsed = NaiveDateTime::parse_from_str(first, EVENT_TIMESTAMP_FORMAT)
        .map_err(|e| AuditError::Parse(format!("{:?}: {}", first, e)))?;
    Ok(Some(parsed.and_utc()))
}
