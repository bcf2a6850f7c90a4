//! The report review controller.
//!
//! `ReportUi` owns a decoded report, the selection state built from it and the
//! state derived on the last recompute. It is constructed by an entry point
//! and handed to the view; nothing here is global.

use std::collections::BTreeSet;

use super::command::CliCommand;
use super::state::{ReviewState, UiState};
use super::types::{ItemKey, ReviewResult, ReviewStatus};
use crate::config::ScriptSettings;
use crate::loader::{self, ReportSource};
use crate::schema::{ReportData, Screenshot, ScreenshotCategory};

/// Which parts of the tree are folded away in the view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disclosure {
    pub collapsed_collections: BTreeSet<String>,
    pub collapsed_pages: BTreeSet<(String, String)>,
    /// Image detail rows under each user agent
    pub images_expanded: bool,
}

impl Disclosure {
    pub fn is_collection_collapsed(&self, collection: &str) -> bool {
        self.collapsed_collections.contains(collection)
    }

    pub fn is_page_collapsed(&self, collection: &str, html_file_path: &str) -> bool {
        self.collapsed_pages
            .contains(&(collection.to_string(), html_file_path.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct ReportUi {
    report: ReportData,
    state: ReviewState,
    ui_state: UiState,
    modal: Option<CliCommand>,
    last_command: Option<CliCommand>,
    disclosure: Disclosure,
    scripts: ScriptSettings,
}

impl ReportUi {
    /// Load the report once and derive the initial state
    pub async fn initialize(source: &ReportSource, scripts: ScriptSettings) -> ReviewResult<Self> {
        let report = loader::fetch_report(source).await?;
        Ok(Self::from_report(report, scripts))
    }

    pub fn from_report(report: ReportData, scripts: ScriptSettings) -> Self {
        let state = ReviewState::from_report(&report);
        let ui_state = state.recompute();
        tracing::debug!(
            items = state.items().len(),
            collections = ui_state.collections.len(),
            "review state built"
        );
        Self {
            report,
            state,
            ui_state,
            modal: None,
            last_command: None,
            disclosure: Disclosure::default(),
            scripts,
        }
    }

    pub fn report(&self) -> &ReportData {
        &self.report
    }

    pub fn state(&self) -> &ReviewState {
        &self.state
    }

    pub fn ui_state(&self) -> &UiState {
        &self.ui_state
    }

    /// Command currently shown in the modal
    pub fn modal(&self) -> Option<&CliCommand> {
        self.modal.as_ref()
    }

    /// Most recent command built, kept after the modal closes
    pub fn last_command(&self) -> Option<&CliCommand> {
        self.last_command.as_ref()
    }

    pub fn disclosure(&self) -> &Disclosure {
        &self.disclosure
    }

    /// Report screenshot behind a review item
    pub fn screenshot(&self, key: &ItemKey) -> Option<&Screenshot> {
        let category = ScreenshotCategory::from_name(&key.collection)?;
        self.report.screenshots.as_ref()?.list(category).iter().find(|s| {
            s.html_file_path == key.html_file_path && s.user_agent_alias() == key.user_agent_alias
        })
    }

    pub fn toggle_collection(&mut self, collection: &str, checked: bool) {
        self.ui_state = self.state.set_collection_checked(collection, checked);
    }

    pub fn toggle_page(&mut self, collection: &str, html_file_path: &str, checked: bool) {
        self.ui_state = self.state.set_page_checked(collection, html_file_path, checked);
    }

    pub fn toggle_user_agent(&mut self, key: &ItemKey, checked: bool) {
        self.ui_state = self.state.set_user_agent_checked(key, checked);
    }

    pub fn select_all(&mut self) {
        self.ui_state = self.state.select_all();
    }

    pub fn select_none(&mut self) {
        self.ui_state = self.state.select_none();
    }

    pub fn select_inverse(&mut self) {
        self.ui_state = self.state.select_inverse();
    }

    /// Mark the checked screenshots approved and show the approve command
    ///
    /// Does nothing while no item is checked.
    pub fn approve_selected(&mut self) -> Option<&CliCommand> {
        if !self.ui_state.toolbar.approve_enabled {
            return None;
        }
        self.mark_checked(ReviewStatus::Approve);
        let command =
            CliCommand::approve(&self.scripts, &self.ui_state, self.report.report_json_url());
        self.show_cli_modal(command)
    }

    /// Mark the checked screenshots for retry and show the test command
    pub fn retry_selected(&mut self) -> Option<&CliCommand> {
        if !self.ui_state.toolbar.retry_enabled {
            return None;
        }
        self.mark_checked(ReviewStatus::Retry);
        let command = CliCommand::retry(&self.scripts, &self.ui_state);
        self.show_cli_modal(command)
    }

    fn mark_checked(&mut self, status: ReviewStatus) {
        let marked = self.state.mark_checked(status);
        self.ui_state = self.state.recompute();
        tracing::info!(status = status.as_str(), marked, "review status set");
    }

    fn show_cli_modal(&mut self, command: CliCommand) -> Option<&CliCommand> {
        tracing::debug!(command = %command, "showing CLI command");
        self.last_command = Some(command.clone());
        self.modal = Some(command);
        self.modal.as_ref()
    }

    /// Close the modal; closing also clears the selection
    pub fn close_cli_modal(&mut self) {
        self.modal = None;
        self.select_none();
    }

    /// Fold every collection away
    pub fn collapse_all(&mut self) {
        self.disclosure.collapsed_collections = self
            .state
            .items()
            .iter()
            .map(|i| i.key.collection.clone())
            .collect();
        self.disclosure.images_expanded = false;
    }

    /// Unfold everything, images included
    pub fn collapse_none(&mut self) {
        self.disclosure = Disclosure {
            images_expanded: true,
            ..Disclosure::default()
        };
    }

    /// Unfold collections and pages but hide image rows
    pub fn collapse_images(&mut self) {
        self.disclosure = Disclosure::default();
    }

    pub fn toggle_collection_disclosure(&mut self, collection: &str) {
        if !self.disclosure.collapsed_collections.remove(collection) {
            self.disclosure
                .collapsed_collections
                .insert(collection.to_string());
        }
    }

    pub fn toggle_page_disclosure(&mut self, collection: &str, html_file_path: &str) {
        let key = (collection.to_string(), html_file_path.to_string());
        if !self.disclosure.collapsed_pages.remove(&key) {
            self.disclosure.collapsed_pages.insert(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ReportMeta, Screenshots, TestFile, UserAgent};
    use pretty_assertions::assert_eq;

    fn scripts() -> ScriptSettings {
        ScriptSettings {
            approve: "screenshot:approve".to_string(),
            test: "screenshot:test".to_string(),
        }
    }

    fn report() -> ReportData {
        let shot = |page: &str, alias: &str| Screenshot {
            html_file_path: page.to_string(),
            user_agent: Some(UserAgent {
                alias: alias.to_string(),
                is_runnable: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut screenshots = Screenshots::default();
        screenshots.push(ScreenshotCategory::Changed, shot("a.html", "chrome"));
        screenshots.push(ScreenshotCategory::Changed, shot("a.html", "firefox"));
        screenshots.push(ScreenshotCategory::Added, shot("b.html", "chrome"));
        ReportData {
            meta: Some(ReportMeta {
                report_json_file: Some(TestFile {
                    public_url: "https://example.com/report.json".to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            screenshots: Some(screenshots),
            ..Default::default()
        }
    }

    #[test]
    fn test_approve_selected_opens_modal() {
        let mut ui = ReportUi::from_report(report(), scripts());
        assert!(ui.approve_selected().is_none());

        ui.toggle_collection("changed", true);
        let command = ui.approve_selected().cloned().unwrap();
        assert_eq!(
            command.to_string(),
            "npm run screenshot:approve -- --all-changed --report=https://example.com/report.json"
        );
        assert_eq!(ui.modal(), Some(&command));

        let changed = ui.ui_state().collection("changed").unwrap();
        assert_eq!(changed.badge.text(), "approve");
        assert_eq!(ui.ui_state().collection("added").unwrap().badge.text(), "unreviewed");
    }

    #[test]
    fn test_close_modal_clears_selection() {
        let mut ui = ReportUi::from_report(report(), scripts());
        ui.select_all();
        ui.retry_selected();
        assert!(ui.modal().is_some());

        ui.close_cli_modal();
        assert!(ui.modal().is_none());
        assert!(ui.ui_state().checked().is_empty());
        assert!(ui.last_command().is_some());
        // Review status survives the close
        assert_eq!(ui.ui_state().collection("changed").unwrap().badge.text(), "retry");
    }

    #[test]
    fn test_disclosure() {
        let mut ui = ReportUi::from_report(report(), scripts());
        ui.collapse_all();
        assert!(ui.disclosure().is_collection_collapsed("changed"));
        assert!(ui.disclosure().is_collection_collapsed("added"));

        ui.collapse_none();
        assert!(!ui.disclosure().is_collection_collapsed("changed"));
        assert!(ui.disclosure().images_expanded);

        ui.collapse_images();
        assert!(!ui.disclosure().images_expanded);

        ui.toggle_page_disclosure("changed", "a.html");
        assert!(ui.disclosure().is_page_collapsed("changed", "a.html"));
        ui.toggle_page_disclosure("changed", "a.html");
        assert!(!ui.disclosure().is_page_collapsed("changed", "a.html"));
    }

    #[test]
    fn test_screenshot_lookup() {
        let ui = ReportUi::from_report(report(), scripts());
        let key = ItemKey::new("added", "b.html", "chrome");
        assert_eq!(ui.screenshot(&key).map(|s| s.html_file_path.as_str()), Some("b.html"));
        assert!(ui.screenshot(&ItemKey::new("bogus", "b.html", "chrome")).is_none());
    }
}
