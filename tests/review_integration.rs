//! Integration tests for the review controller driven by a real report

use pretty_assertions::assert_eq;

use screenshot_report::config::ScriptSettings;
use screenshot_report::review::{ItemKey, ReportUi, ReviewStatus, StatusBadge, render_lines};
use screenshot_report::schema::{ReportData, ReportMessage};

const FIXTURE: &str = include_str!("fixtures/report.json");
const REPORT_URL: &str = "https://storage.example.com/run-42/report/report.json";
const CHROME: &str = "desktop_windows_chrome@latest";
const FIREFOX: &str = "desktop_windows_firefox@latest";
const BASELINE: &str = "button/classes/baseline.html";

fn ui() -> ReportUi {
    let report = ReportData::from_json_str(FIXTURE).unwrap();
    ReportUi::from_report(
        report,
        ScriptSettings {
            approve: "screenshot:approve".to_string(),
            test: "screenshot:test".to_string(),
        },
    )
}

#[test]
fn test_initial_state() {
    let ui = ui();
    assert_eq!(ui.state().items().len(), 5);

    let ui_state = ui.ui_state();
    // The removed collection holds only a non-runnable user agent
    let names: Vec<&str> = ui_state.collections.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["changed", "added"]);
    assert_eq!(ui_state.unchecked().len(), 4);
    assert!(!ui_state.toolbar.hidden);
    assert!(!ui_state.toolbar.approve_enabled);
    assert!(ui.modal().is_none());
}

#[test]
fn test_approve_everything() {
    let mut ui = ui();
    ui.select_all();
    let command = ui.approve_selected().cloned().unwrap();
    assert_eq!(command.args, vec!["--all".to_string(), format!("--report={REPORT_URL}")]);
    assert_eq!(
        command.to_string(),
        format!("npm run screenshot:approve -- --all --report={REPORT_URL}")
    );
}

#[test]
fn test_approve_partial_selection() {
    let mut ui = ui();
    ui.toggle_collection("added", true);
    ui.toggle_user_agent(&ItemKey::new("changed", BASELINE, FIREFOX), true);
    let command = ui.approve_selected().cloned().unwrap();
    assert_eq!(
        command.args,
        vec![
            format!("--changed={BASELINE}:{FIREFOX}"),
            "--all-added".to_string(),
            format!("--report={REPORT_URL}"),
        ]
    );

    let changed = ui.ui_state().collection("changed").unwrap();
    assert_eq!(changed.badge, StatusBadge::Mixed);
    assert_eq!(
        changed.page(BASELINE).unwrap().badge,
        StatusBadge::Mixed,
    );
    assert_eq!(
        ui.ui_state().collection("added").unwrap().badge,
        StatusBadge::Status(ReviewStatus::Approve)
    );
}

#[test]
fn test_retry_loses_pairing() {
    let mut ui = ui();
    ui.toggle_user_agent(&ItemKey::new("changed", BASELINE, FIREFOX), true);
    ui.toggle_user_agent(
        &ItemKey::new("changed", "checkbox/classes/disabled.html", CHROME),
        true,
    );
    let command = ui.retry_selected().cloned().unwrap();
    assert_eq!(
        command.args,
        vec![
            format!("--url={BASELINE}"),
            "--url=checkbox/classes/disabled.html".to_string(),
            format!("--browser={FIREFOX}"),
            format!("--browser={CHROME}"),
        ]
    );
}

#[test]
fn test_disabled_items_never_selected() {
    let mut ui = ui();
    let ie = ItemKey::new("removed", "button/classes/dense.html", "desktop_windows_ie@11");
    ui.select_all();
    ui.toggle_user_agent(&ie, true);
    ui.toggle_collection("removed", true);
    ui.select_inverse();
    ui.select_inverse();
    assert!(!ui.state().item(&ie).unwrap().checked);
    assert_eq!(ui.ui_state().toolbar.selected_count, 4);

    let lines = render_lines(&ui);
    assert!(lines.iter().any(|l| l.text == "v [/] removed (1)"));
}

#[test]
fn test_modal_close_clears_selection_keeps_status() {
    let mut ui = ui();
    ui.toggle_page("changed", BASELINE, true);
    ui.retry_selected();
    let lines = render_lines(&ui);
    assert!(lines.iter().any(|l| l.text.starts_with("  npm run screenshot:test --")));

    ui.close_cli_modal();
    assert!(ui.modal().is_none());
    assert_eq!(ui.ui_state().toolbar.selected_count, 0);
    let page = ui.ui_state().collection("changed").unwrap().page(BASELINE).unwrap();
    assert_eq!(page.badge, StatusBadge::Status(ReviewStatus::Retry));
}
