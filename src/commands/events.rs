// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Events report command

use crate::client::transport::HttpTransport;
use crate::client::ApiClient;
use crate::config::AuditConfig;
use crate::error::Result;
use crate::events::{AuditWindowCollector, CursorSource, ResumeCursor, TimeWindow};
use crate::output::{append_csv, OutputPaths, ProgressSink};
use chrono::{DateTime, Utc};

/// Collect events since the resume point and append them to `Copilot_Events.csv`.
/// Returns `false` on failure.
pub fn run_events<T: HttpTransport>(
    client: &mut ApiClient<T>,
    config: &AuditConfig,
    paths: &OutputPaths,
    progress: &mut dyn ProgressSink,
    now: DateTime<Utc>,
) -> bool {
    match export_events(client, config, paths, progress, now) {
        Ok(_) => true,
        Err(e) => {
            log::error!("Error retrieving events: {}", e);
            false
        }
    }
}

fn export_events<T: HttpTransport>(
    client: &mut ApiClient<T>,
    config: &AuditConfig,
    paths: &OutputPaths,
    progress: &mut dyn ProgressSink,
    now: DateTime<Utc>,
) -> Result<usize> {
    let cursor = ResumeCursor::from_events_csv(&paths.events_csv, config.lookback_days, now)?;
    match cursor.source {
        CursorSource::LastEvent => log::info!(
            "Resuming from last recorded event at {}",
            cursor.start.format("%Y-%m-%d %H:%M:%S")
        ),
        CursorSource::Lookback => log::info!(
            "No previous events found; looking back {} days",
            config.lookback_days
        ),
    }

    let span = TimeWindow {
        start: cursor.start,
        end: now,
    };
    let begin = format!("BEGIN: Retrieving audit records between {}", span);
    log::info!("{}", begin);
    progress.note(&begin)?;

    let report = AuditWindowCollector::new(client, config.interval_minutes)?.collect(
        span.start,
        span.end,
        progress,
    )?;

    let skipped = report.skipped_windows();
    if skipped > 0 {
        log::warn!("{} time window(s) skipped after listing errors", skipped);
    }

    let events = report.into_events();
    if events.is_empty() {
        log::info!("No Copilot events found in this run");
    } else {
        append_csv(&paths.events_csv, &events)?;
        log::info!(
            "Appended {} events to {}",
            events.len(),
            paths.events_csv.display()
        );
    }

    let end = format!("END: Retrieved {} audit records", events.len());
    log::info!("{}", end);
    progress.note(&end)?;
    Ok(events.len())
}
