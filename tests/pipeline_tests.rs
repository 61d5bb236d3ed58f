//! End-to-end tests for the users and events reports
//!
//! Both reports run against a scripted transport serving the JSON fixtures in
//! `tests/fixtures/`, and the CSV output is compared byte-for-byte.

mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::{fixture, fixture_path, test_config, ScriptedTransport, FEED, GRAPH};
use copilot_audit::events::CursorSource;
use copilot_audit::{
    fetch_all, run_events, run_users, ApiClient, HttpResponse, MemoryProgress, OutputPaths,
    ResumeCursor,
};
use std::fs;
use tempfile::TempDir;

const BLOB: &str = "https://manage.test/blob/20250105-1";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap()
}

fn graph_transport() -> ScriptedTransport {
    let transport = ScriptedTransport::new();
    transport
        .respond(&format!("{}/users", GRAPH), 200, &fixture("graph_users_page1.json"))
        .respond(
            &format!("{}/users?$skiptoken=page2", GRAPH),
            200,
            &fixture("graph_users_page2.json"),
        )
        .respond(
            &format!("{}/users/11111111-aaaa/manager", GRAPH),
            200,
            &fixture("graph_manager.json"),
        )
        .respond(
            &format!("{}/users/22222222-bbbb/manager", GRAPH),
            403,
            r#"{"error":{"code":"Authorization_RequestDenied"}}"#,
        );
    transport
}

fn management_transport() -> ScriptedTransport {
    let transport = ScriptedTransport::new();
    transport
        .respond(&format!("{}/subscriptions/start", FEED), 400, "")
        .respond(
            &format!("{}/subscriptions/content", FEED),
            200,
            &fixture("management_listing.json"),
        )
        .respond(BLOB, 200, &fixture("management_blob.json"));
    transport
}

// =============================================================================
// Users report
// =============================================================================

mod users_report {
    use super::*;

    #[test]
    fn test_users_csv_matches_fixture() {
        let dir = TempDir::new().unwrap();
        let paths = OutputPaths::new(dir.path());
        let config = test_config();
        let mut client = ApiClient::new(graph_transport(), &config);

        assert!(run_users(&mut client, &config, &paths));

        let written = fs::read(&paths.users_csv).unwrap();
        let expected = fs::read(fixture_path("expected_users.csv")).unwrap();
        assert_eq!(
            String::from_utf8_lossy(&written),
            String::from_utf8_lossy(&expected)
        );
    }

    #[test]
    fn test_users_csv_is_replaced_each_run() {
        let dir = TempDir::new().unwrap();
        let paths = OutputPaths::new(dir.path());
        fs::write(&paths.users_csv, "stale,contents\r\nfrom,last run\r\n").unwrap();
        let config = test_config();
        let mut client = ApiClient::new(graph_transport(), &config);

        assert!(run_users(&mut client, &config, &paths));
        let written = fs::read_to_string(&paths.users_csv).unwrap();
        assert!(!written.contains("stale"));
        assert_eq!(written.lines().count(), 4);
    }

    #[test]
    fn test_second_page_uses_continuation_link_only() {
        let config = test_config();
        let mut client = ApiClient::new(graph_transport(), &config);

        let paged = fetch_all::<serde_json::Value, _>(
            &mut client,
            "/users",
            &[("$filter", "jobTitle ne null"), ("$top", "999")],
        );

        assert!(paged.is_complete());
        assert_eq!(paged.items.len(), 3);
        assert_eq!(paged.requests, 2);
        let continuation = client
            .transport()
            .requests_to(&format!("{}/users?$skiptoken=page2", GRAPH));
        assert_eq!(continuation.len(), 1);
        assert!(continuation[0].query.is_empty());
    }

    #[test]
    fn test_sku_allow_list_override() {
        let dir = TempDir::new().unwrap();
        let paths = OutputPaths::new(dir.path());
        let mut config = test_config();
        config.copilot_sku_ids = vec!["6FD2C87F-B296-42F0-B197-1E91E994B900".to_string()];
        let mut client = ApiClient::new(graph_transport(), &config);

        assert!(run_users(&mut client, &config, &paths));
        let written = fs::read_to_string(&paths.users_csv).unwrap();
        let flags: Vec<&str> = written
            .lines()
            .skip(1)
            .map(|l| l.rsplit(',').next().unwrap())
            .collect();
        assert_eq!(flags, vec!["False", "True", "False"]);
    }
}

// =============================================================================
// Events report
// =============================================================================

mod events_report {
    use super::*;

    #[test]
    fn test_events_csv_matches_fixture() {
        let dir = TempDir::new().unwrap();
        let paths = OutputPaths::new(dir.path());
        let config = test_config();
        let mut client = ApiClient::new(management_transport(), &config);
        let mut progress = MemoryProgress::default();

        assert!(run_events(&mut client, &config, &paths, &mut progress, now()));

        let written = fs::read(&paths.events_csv).unwrap();
        let expected = fs::read(fixture_path("expected_events.csv")).unwrap();
        assert_eq!(
            String::from_utf8_lossy(&written),
            String::from_utf8_lossy(&expected)
        );
        assert_eq!(
            progress.lines,
            vec![
                "BEGIN: Retrieving audit records between 2025-01-05 00:00:00 and 2025-01-06 00:00:00",
                "INFO: Retrieved 3 audit records for activities between 2025-01-05 00:00:00 and 2025-01-06 00:00:00",
                "END: Retrieved 3 audit records",
            ]
        );
    }

    #[test]
    fn test_only_copilot_record_type_is_kept() {
        let dir = TempDir::new().unwrap();
        let paths = OutputPaths::new(dir.path());
        let config = test_config();
        let mut client = ApiClient::new(management_transport(), &config);
        let mut progress = MemoryProgress::default();

        assert!(run_events(&mut client, &config, &paths, &mut progress, now()));

        let written = fs::read_to_string(&paths.events_csv).unwrap();
        // the blob holds four records, one of them a sign-in (RecordType 15)
        assert_eq!(written.lines().count(), 1 + 3);
        assert!(!written.contains("14:45:00"));
    }

    #[test]
    fn test_second_run_appends_without_header() {
        let dir = TempDir::new().unwrap();
        let paths = OutputPaths::new(dir.path());
        let config = test_config();
        let mut progress = MemoryProgress::default();

        let mut client = ApiClient::new(management_transport(), &config);
        assert!(run_events(&mut client, &config, &paths, &mut progress, now()));
        let mut client = ApiClient::new(management_transport(), &config);
        assert!(run_events(
            &mut client,
            &config,
            &paths,
            &mut progress,
            now() + Duration::hours(1)
        ));

        let written = fs::read_to_string(&paths.events_csv).unwrap();
        assert_eq!(written.matches("TimeStamp,User,App").count(), 1);
        assert_eq!(written.lines().count(), 1 + 3 + 3);

        // second run resumed from the last appended row
        let listing = client
            .transport()
            .requests_to(&format!("{}/subscriptions/content", FEED));
        let start = listing[0]
            .query
            .iter()
            .find(|(k, _)| k == "startTime")
            .map(|(_, v)| v.as_str());
        assert_eq!(start, Some("2025-01-05T16:45:10"));
    }

    #[test]
    fn test_failed_blob_download_is_skipped() {
        let dir = TempDir::new().unwrap();
        let paths = OutputPaths::new(dir.path());
        let config = test_config();
        let transport = ScriptedTransport::new();
        transport
            .respond(
                &format!("{}/subscriptions/content", FEED),
                200,
                r#"[{"contentUri":"https://manage.test/blob/missing"},{"contentUri":"https://manage.test/blob/20250105-1"}]"#,
            )
            .respond("https://manage.test/blob/missing", 500, "")
            .respond(BLOB, 200, &fixture("management_blob.json"));
        let mut client = ApiClient::new(transport, &config);
        let mut progress = MemoryProgress::default();

        assert!(run_events(&mut client, &config, &paths, &mut progress, now()));
        assert_eq!(progress.lines.last().unwrap(), "END: Retrieved 3 audit records");
    }

    #[test]
    fn test_listing_failure_skips_window_and_continues() {
        let dir = TempDir::new().unwrap();
        let paths = OutputPaths::new(dir.path());
        let mut config = test_config();
        config.lookback_days = 2;
        let transport = ScriptedTransport::new();
        let listing = format!("{}/subscriptions/content", FEED);
        transport
            .respond_full(&listing, HttpResponse::new(500, "upstream error"))
            .respond(&listing, 200, &fixture("management_listing.json"))
            .respond(BLOB, 200, &fixture("management_blob.json"));
        let mut client = ApiClient::new(transport, &config);
        let mut progress = MemoryProgress::default();

        assert!(run_events(&mut client, &config, &paths, &mut progress, now()));
        assert!(progress.lines[1].starts_with("WARN: Skipped activities between 2025-01-04 00:00:00"));
        assert_eq!(progress.lines.last().unwrap(), "END: Retrieved 3 audit records");
    }
}

// =============================================================================
// Resume cursor
// =============================================================================

mod resume_cursor {
    use super::*;

    #[test]
    fn test_resume_from_last_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Copilot_Events.csv");
        fs::copy(fixture_path("expected_events.csv"), &path).unwrap();
        fs::write(
            &path,
            fs::read_to_string(&path).unwrap()
                + "05-Jan-2025 14:30:00,ada@contoso.test,Excel,,,,,,\r\n",
        )
        .unwrap();

        let cursor = ResumeCursor::from_events_csv(&path, 90, now()).unwrap();
        assert_eq!(cursor.source, CursorSource::LastEvent);
        assert_eq!(cursor.start, Utc.with_ymd_and_hms(2025, 1, 5, 14, 30, 0).unwrap());
    }

    #[test]
    fn test_no_file_uses_default_lookback() {
        let dir = TempDir::new().unwrap();
        let cursor =
            ResumeCursor::from_events_csv(&dir.path().join("missing.csv"), 90, now()).unwrap();
        assert_eq!(cursor.source, CursorSource::Lookback);
        assert_eq!(cursor.start, now() - Duration::days(90));
    }

    #[test]
    fn test_unparseable_last_row_falls_back_to_lookback() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Copilot_Events.csv");
        fs::write(&path, "TimeStamp,User\r\nyesterday-ish,ada@contoso.test\r\n").unwrap();

        let cursor = ResumeCursor::from_events_csv(&path, 7, now()).unwrap();
        assert_eq!(cursor.source, CursorSource::Lookback);
        assert_eq!(cursor.start, now() - Duration::days(7));
    }
}
