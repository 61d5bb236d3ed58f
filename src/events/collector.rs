// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Time-windowed collection from the Office 365 Management Activity API
//!
//! The range `[start, end)` is cut into fixed-size windows. For each window the
//! `Audit.General` content blobs are listed and downloaded, and Copilot
//! interaction records are normalized. A failed listing skips the window and a
//! failed download skips the blob; both are recorded in the window's outcome.

use super::normalizer::{try_normalize, CopilotEventRecord};
use super::record::COPILOT_INTERACTION_RECORD_TYPE;
use crate::client::token::Audience;
use crate::client::transport::{ApiRequest, HttpTransport};
use crate::client::ApiClient;
use crate::error::{AuditError, Result};
use crate::output::ProgressSink;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

pub const AUDIT_CONTENT_TYPE: &str = "Audit.General";
const API_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const NEXT_PAGE_HEADER: &str = "NextPageUri";

/// Half-open interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} and {}",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Consecutive windows of `size` covering `[start, end)`; the last may be shorter.
/// A window reaching past the representable range ends at `end`.
pub fn time_windows(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    size: Duration,
) -> Vec<TimeWindow> {
    let mut windows = Vec::new();
    if size <= Duration::zero() {
        return windows;
    }
    let mut current = start;
    while current < end {
        let next = current
            .checked_add_signed(size)
            .map_or(end, |next| next.min(end));
        windows.push(TimeWindow {
            start: current,
            end: next,
        });
        current = next;
    }
    windows
}

/// Entry of a content listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlob {
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content_id: Option<String>,
    #[serde(default)]
    pub content_uri: Option<String>,
    #[serde(default)]
    pub content_created: Option<String>,
}

enum Listing {
    Blobs(Vec<ContentBlob>),
    NoContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowStatus {
    Collected,
    /// The API reported no content for the window
    NoContent,
    /// Listing failed; the window was skipped
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedBlob {
    pub content_uri: String,
    pub reason: String,
}

/// What happened in one window
#[derive(Debug, Clone)]
pub struct WindowOutcome {
    pub window: TimeWindow,
    pub status: WindowStatus,
    pub blobs_listed: usize,
    pub skipped_blobs: Vec<SkippedBlob>,
    /// Copilot records that failed to normalize
    pub dropped_records: usize,
    pub events: Vec<CopilotEventRecord>,
}

impl WindowOutcome {
    fn new(window: TimeWindow) -> Self {
        Self {
            window,
            status: WindowStatus::Collected,
            blobs_listed: 0,
            skipped_blobs: Vec::new(),
            dropped_records: 0,
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectionReport {
    pub windows: Vec<WindowOutcome>,
}

impl CollectionReport {
    pub fn total_events(&self) -> usize {
        self.windows.iter().map(|w| w.events.len()).sum()
    }

    /// Events in retrieval order
    pub fn into_events(self) -> Vec<CopilotEventRecord> {
        self.windows.into_iter().flat_map(|w| w.events).collect()
    }

    pub fn skipped_windows(&self) -> usize {
        self.windows
            .iter()
            .filter(|w| matches!(w.status, WindowStatus::Skipped(_)))
            .count()
    }
}

pub struct AuditWindowCollector<'a, T: HttpTransport> {
    client: &'a mut ApiClient<T>,
    window_size: Duration,
}

impl<'a, T: HttpTransport> AuditWindowCollector<'a, T> {
    /// Fails when `window_minutes` is not a representable duration.
    pub fn new(client: &'a mut ApiClient<T>, window_minutes: i64) -> Result<Self> {
        let window_size =
            Duration::try_minutes(window_minutes).ok_or_else(|| AuditError::InvalidConfig {
                key: "AUDIT_INTERVAL_MINUTES".to_string(),
                value: window_minutes.to_string(),
            })?;
        Ok(Self {
            client,
            window_size,
        })
    }

    /// Collect Copilot events between `start` and `end`.
    ///
    /// Only a Management API token failure or a progress-log write failure
    /// aborts; everything else is recorded per window.
    pub fn collect(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        progress: &mut dyn ProgressSink,
    ) -> Result<CollectionReport> {
        self.client.token(Audience::Management)?;
        self.ensure_subscription();

        let mut report = CollectionReport::default();
        for window in time_windows(start, end, self.window_size) {
            log::info!(
                "Retrieving audit records for activities between {}",
                window
            );
            let outcome = self.collect_window(window);
            let note = match &outcome.status {
                WindowStatus::Skipped(reason) => format!(
                    "WARN: Skipped activities between {}: {}",
                    window, reason
                ),
                _ => format!(
                    "INFO: Retrieved {} audit records for activities between {}",
                    outcome.events.len(),
                    window
                ),
            };
            progress.note(&note)?;
            report.windows.push(outcome);
        }
        Ok(report)
    }

    /// Start the `Audit.General` subscription, or confirm it is already running.
    pub fn ensure_subscription(&mut self) {
        let url = format!("{}/subscriptions/start", self.client.activity_feed_url());
        let tenant = self.client.tenant_id().to_string();
        let request = ApiRequest::post(url).query(&[
            ("contentType", AUDIT_CONTENT_TYPE),
            ("PublisherIdentifier", tenant.as_str()),
        ]);

        match self.client.management_send(request) {
            // 400 is returned when the subscription is already enabled
            Ok(response) if response.status == 200 || response.status == 400 => {
                log::info!("Audit subscription active");
            }
            Ok(response) => {
                log::warn!(
                    "Could not start subscription: HTTP {} {}",
                    response.status,
                    response.body
                );
            }
            Err(e) => log::warn!("Could not start subscription: {}", e),
        }
    }

    fn collect_window(&mut self, window: TimeWindow) -> WindowOutcome {
        let mut outcome = WindowOutcome::new(window);

        let blobs = match self.list_content(window) {
            Ok(Listing::Blobs(blobs)) => blobs,
            Ok(Listing::NoContent) => {
                log::info!("No content available for this time range");
                outcome.status = WindowStatus::NoContent;
                return outcome;
            }
            Err(e) => {
                log::error!("Error listing content: {}", e);
                outcome.status = WindowStatus::Skipped(e.to_string());
                return outcome;
            }
        };

        log::info!("Found {} content blobs", blobs.len());
        outcome.blobs_listed = blobs.len();

        for blob in blobs {
            let Some(uri) = blob.content_uri.filter(|u| !u.is_empty()) else {
                continue;
            };
            match self.download_blob(&uri) {
                Ok(records) => {
                    let copilot: Vec<&Value> = records
                        .iter()
                        .filter(|r| {
                            r.get("RecordType").and_then(Value::as_i64)
                                == Some(COPILOT_INTERACTION_RECORD_TYPE)
                        })
                        .collect();
                    log::info!("Found {} Copilot records in blob", copilot.len());

                    for record in copilot {
                        match try_normalize(record) {
                            Ok(event) => outcome.events.push(event),
                            Err(e) => {
                                log::error!("Error parsing event: {}", e);
                                outcome.dropped_records += 1;
                            }
                        }
                    }
                }
                Err(e) => {
                    log::error!("Error downloading content blob {}: {}", uri, e);
                    outcome.skipped_blobs.push(SkippedBlob {
                        content_uri: uri,
                        reason: e.to_string(),
                    });
                }
            }
        }

        outcome
    }

    fn list_content(&mut self, window: TimeWindow) -> Result<Listing> {
        let url = format!("{}/subscriptions/content", self.client.activity_feed_url());
        let start = window.start.format(API_TIME_FORMAT).to_string();
        let end = window.end.format(API_TIME_FORMAT).to_string();
        let tenant = self.client.tenant_id().to_string();

        let mut request = ApiRequest::get(&url).query(&[
            ("contentType", AUDIT_CONTENT_TYPE),
            ("startTime", start.as_str()),
            ("endTime", end.as_str()),
            ("PublisherIdentifier", tenant.as_str()),
        ]);
        let mut blobs = Vec::new();
        let mut first_page = true;

        loop {
            let request_url = request.url.clone();
            let response = self.client.management_send(request)?;
            if response.status == 204 && first_page {
                return Ok(Listing::NoContent);
            }
            if response.status != 200 && response.status != 204 {
                log::warn!("List content request returned status {}", response.status);
                return Err(AuditError::Http {
                    status: response.status,
                    url: request_url,
                });
            }
            if response.status == 200 {
                blobs.extend(response.json::<Vec<ContentBlob>>()?);
            }

            match response.header(NEXT_PAGE_HEADER) {
                Some(next) if !next.is_empty() => {
                    request = ApiRequest::get(next);
                    first_page = false;
                }
                _ => break,
            }
        }

        Ok(Listing::Blobs(blobs))
    }

    fn download_blob(&mut self, uri: &str) -> Result<Vec<Value>> {
        self.client
            .management_send(ApiRequest::get(uri))?
            .error_for_status(uri)?
            .json()
    }
}
