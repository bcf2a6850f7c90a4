//! Integration tests for the report codec against a realistic report

use pretty_assertions::assert_eq;
use serde_json::json;

use screenshot_report::schema::{
    CaptureState, GitRevisionType, InclusionType, ReportData, ReportMessage, SchemaError,
    ScreenshotCategory, Verify, diff_base,
};

const FIXTURE: &str = include_str!("fixtures/report.json");

fn fixture() -> ReportData {
    ReportData::from_json_str(FIXTURE).expect("fixture should decode")
}

#[test]
fn test_fixture_decodes() {
    let report = fixture();
    let meta = report.meta.as_ref().unwrap();
    assert_eq!(meta.start_time_utc_ms, 1_536_778_800_000);
    assert_eq!(meta.duration().as_secs(), 121);
    assert_eq!(
        report.report_json_url(),
        "https://storage.example.com/run-42/report/report.json"
    );

    let diff_base = meta.golden_diff_base.as_ref().unwrap();
    match &diff_base.value {
        Some(diff_base::Value::GitRevision(rev)) => {
            assert_eq!(rev.r#type, GitRevisionType::RemoteBranch as i32);
            assert_eq!(rev.branch, "master");
        }
        other => panic!("unexpected diff base {:?}", other),
    }

    let screenshots = report.screenshots.as_ref().unwrap();
    let changed = screenshots.list(ScreenshotCategory::Changed);
    assert_eq!(changed.len(), 3);
    assert_eq!(changed[0].capture_state, CaptureState::Diffed as i32);
    // Numeric enum tags are accepted as well as names
    assert_eq!(changed[2].inclusion_type, InclusionType::Compare as i32);
    // 64-bit values are accepted as numbers as well as strings
    assert_eq!(changed[1].image_diff_result.as_ref().unwrap().diff_pixel_count, 300);
}

#[test]
fn test_binary_round_trip() {
    let report = fixture();
    let bytes = report.encode_bytes();
    let decoded = ReportData::decode_bytes(&bytes).unwrap();
    assert_eq!(decoded, report);
}

#[test]
fn test_object_round_trip() {
    let report = fixture();
    let object = report.to_object().unwrap();
    assert_eq!(
        object["meta"]["start_time_utc_ms"],
        json!("1536778800000"),
        "64-bit fields are written as strings"
    );
    assert_eq!(
        object["screenshots"]["changed_screenshot_list"][2]["inclusion_type"],
        json!("COMPARE")
    );
    assert_eq!(ReportData::from_object(object).unwrap(), report);
}

#[test]
fn test_truncated_bytes_fail() {
    let bytes = fixture().encode_bytes();
    let truncated = &bytes[..bytes.len() / 2];
    assert!(matches!(
        ReportData::decode_bytes(truncated),
        Err(SchemaError::Decode(_))
    ));
}

#[test]
fn test_unknown_enum_rejected() {
    let object = json!({
        "screenshots": {
            "added_screenshot_list": [{ "html_file_path": "a.html", "capture_state": 42 }]
        }
    });
    assert!(matches!(
        ReportData::verify_object(&object),
        Err(SchemaError::Verify { .. })
    ));

    let mut report = fixture();
    if let Some(screenshots) = report.screenshots.as_mut() {
        screenshots.added_screenshot_list[0].inclusion_type = 99;
    }
    assert!(report.verify().is_err());
}

#[test]
fn test_diff_base_oneof_exclusive() {
    let object = json!({
        "meta": {
            "golden_diff_base": {
                "input_string": "x",
                "file_path": "golden.json",
                "public_url": "https://example.com/golden.json"
            }
        }
    });
    assert!(ReportData::verify_object(&object).is_err());

    let object = json!({
        "meta": { "golden_diff_base": { "input_string": "x", "file_path": "golden.json" } }
    });
    assert!(ReportData::verify_object(&object).is_ok());
}

#[test]
fn test_index_maps_follow_lists() {
    let mut report = fixture();
    let screenshots = report.screenshots.as_mut().unwrap();

    // The fixture only carries the flat lists
    assert!(matches!(
        screenshots.check_indexes(),
        Err(SchemaError::IndexMismatch { .. })
    ));

    screenshots.rebuild_indexes();
    screenshots.check_indexes().unwrap();

    let by_page = screenshots.page_map(ScreenshotCategory::Changed);
    assert_eq!(by_page["button/classes/baseline.html"].screenshots.len(), 2);
    let by_browser = screenshots.browser_map(ScreenshotCategory::Changed);
    assert_eq!(by_browser["desktop_windows_chrome@latest"].screenshots.len(), 2);

    // Rebuilt maps survive the binary form
    let decoded = ReportData::decode_bytes(&report.encode_bytes()).unwrap();
    decoded.screenshots.unwrap().check_indexes().unwrap();
}
