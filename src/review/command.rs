//! Approve and retry command construction.

use std::fmt;

use serde::Serialize;

use super::state::UiState;
use crate::config::ScriptSettings;

/// An `npm run` invocation shown to the user for copying
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CliCommand {
    pub script: String,
    pub args: Vec<String>,
}

impl CliCommand {
    pub fn approve(scripts: &ScriptSettings, ui_state: &UiState, report_url: &str) -> Self {
        Self {
            script: scripts.approve.clone(),
            args: approve_command_args(ui_state, report_url),
        }
    }

    pub fn retry(scripts: &ScriptSettings, ui_state: &UiState) -> Self {
        Self {
            script: scripts.test.clone(),
            args: retry_command_args(ui_state),
        }
    }
}

impl fmt::Display for CliCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "npm run {} --", self.script)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Flags for approving the checked screenshots
///
/// Everything checked collapses to `--all`; a fully checked collection to
/// `--all-<collection>`; otherwise the checked pairs are listed.
pub fn approve_command_args(ui_state: &UiState, report_url: &str) -> Vec<String> {
    let report_arg = format!("--report={report_url}");
    if ui_state.unchecked().is_empty() {
        return vec!["--all".to_string(), report_arg];
    }

    let mut args = Vec::new();
    for collection in &ui_state.collections {
        let partition = &collection.partition;
        if partition.checked.is_empty() {
            continue;
        }
        if partition.is_all_checked() {
            args.push(format!("--all-{}", collection.name));
            continue;
        }
        let targets: Vec<String> = collection
            .pages
            .iter()
            .flat_map(|page| page.partition.checked.iter())
            .map(|key| format!("{}:{}", key.html_file_path, key.user_agent_alias))
            .collect();
        args.push(format!("--{}={}", collection.name, targets.join(",")));
    }
    args.push(report_arg);
    args
}

/// Flags for re-running the checked screenshots
///
/// Pages and browsers are collected independently, so the rerun covers their
/// cross product rather than the exact checked pairs.
pub fn retry_command_args(ui_state: &UiState) -> Vec<String> {
    let mut pages: Vec<&str> = Vec::new();
    let mut browsers: Vec<&str> = Vec::new();
    for key in ui_state.checked() {
        if !pages.contains(&key.html_file_path.as_str()) {
            pages.push(&key.html_file_path);
        }
        if !browsers.contains(&key.user_agent_alias.as_str()) {
            browsers.push(&key.user_agent_alias);
        }
    }

    pages
        .into_iter()
        .map(|page| format!("--url={page}"))
        .chain(browsers.into_iter().map(|alias| format!("--browser={alias}")))
        .collect()
}
