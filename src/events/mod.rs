// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Copilot interaction events from the unified audit log

pub mod collector;
pub mod cursor;
pub mod normalizer;
pub mod record;

pub use collector::{
    time_windows, AuditWindowCollector, CollectionReport, TimeWindow, WindowOutcome, WindowStatus,
};
pub use cursor::{CursorSource, ResumeCursor};
pub use normalizer::{
    normalize_event, try_normalize, CopilotApp, CopilotEventRecord, CopilotLocation,
    EVENT_CSV_HEADER,
};
pub use record::COPILOT_INTERACTION_RECORD_TYPE;
