//! Approve-command flags and their resolution against a report.
//!
//! Parses the flags built by the review UI back into a selection:
//!
//! ```text
//! --all
//! --all-<collection>
//! --<collection>=<page>:<alias>[,<page>:<alias>...]
//! --report=<url>
//! ```
//!
//! where `<collection>` is one of `changed`, `added`, `removed`.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::schema::{ApprovalId, Approvals, ReportData, Screenshot, ScreenshotCategory};

/// Result type for approval parsing and resolution
pub type ApprovalResult<T> = Result<T, ApprovalError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("Unknown approve flag: {0}")]
    UnknownFlag(String),

    #[error("Collection '{0}' cannot be approved (expected changed, added or removed)")]
    UnknownCollection(String),

    #[error("Malformed target '{0}' (expected <page>:<alias>)")]
    MalformedTarget(String),

    #[error("No screenshots selected")]
    EmptySelection,

    #[error("No --report=<url> given")]
    MissingReport,

    #[error("Report has no {collection} screenshot for {html_file_path} in {user_agent_alias}")]
    UnknownScreenshot {
        collection: String,
        html_file_path: String,
        user_agent_alias: String,
    },
}

/// Which screenshots an approve command covers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApproveSelection {
    pub all: bool,
    /// Collections approved in full
    pub collections: BTreeSet<ScreenshotCategory>,
    /// Individually listed screenshots per collection
    pub targets: BTreeMap<ScreenshotCategory, Vec<ApprovalId>>,
    pub report_url: Option<String>,
}

fn approvable(name: &str) -> ApprovalResult<ScreenshotCategory> {
    ScreenshotCategory::from_name(name)
        .filter(|c| ScreenshotCategory::APPROVABLE.contains(c))
        .ok_or_else(|| ApprovalError::UnknownCollection(name.to_string()))
}

fn parse_target(target: &str) -> ApprovalResult<ApprovalId> {
    match target.rsplit_once(':') {
        Some((page, alias)) if !page.is_empty() && !alias.is_empty() => Ok(ApprovalId {
            html_file_path: page.to_string(),
            user_agent_alias: alias.to_string(),
        }),
        _ => Err(ApprovalError::MalformedTarget(target.to_string())),
    }
}

impl ApproveSelection {
    pub fn parse<I, S>(args: I) -> ApprovalResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = Self::default();
        for arg in args {
            let arg = arg.as_ref();
            let Some(flag) = arg.strip_prefix("--") else {
                return Err(ApprovalError::UnknownFlag(arg.to_string()));
            };

            if flag == "all" {
                selection.all = true;
            } else if let Some(url) = flag.strip_prefix("report=") {
                selection.report_url = Some(url.to_string());
            } else if let Some((name, list)) = flag.split_once('=') {
                let category = approvable(name)?;
                let ids = list
                    .split(',')
                    .filter(|t| !t.is_empty())
                    .map(parse_target)
                    .collect::<ApprovalResult<Vec<_>>>()?;
                if ids.is_empty() {
                    return Err(ApprovalError::MalformedTarget(list.to_string()));
                }
                selection.targets.entry(category).or_default().extend(ids);
            } else if let Some(name) = flag.strip_prefix("all-") {
                selection.collections.insert(approvable(name)?);
            } else {
                return Err(ApprovalError::UnknownFlag(arg.to_string()));
            }
        }

        if !selection.all && selection.collections.is_empty() && selection.targets.is_empty() {
            return Err(ApprovalError::EmptySelection);
        }
        Ok(selection)
    }

    pub fn report_url(&self) -> ApprovalResult<&str> {
        self.report_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(ApprovalError::MissingReport)
    }

    fn covers_collection(&self, category: ScreenshotCategory) -> bool {
        self.all || self.collections.contains(&category)
    }

    /// Pick the selected screenshots out of a report
    pub fn resolve(&self, report: &ReportData) -> ApprovalResult<Approvals> {
        let screenshots = report.screenshots_or_default();
        let mut approvals = Approvals::default();

        for category in ScreenshotCategory::APPROVABLE {
            let available = screenshots.list(category);
            let mut picked: Vec<Screenshot> = Vec::new();
            let mut seen: BTreeSet<ApprovalId> = BTreeSet::new();

            if self.covers_collection(category) {
                for screenshot in available {
                    if seen.insert(screenshot.approval_id()) {
                        picked.push(screenshot.clone());
                    }
                }
            }
            for id in self.targets.get(&category).into_iter().flatten() {
                if seen.contains(id) {
                    continue;
                }
                let screenshot = available
                    .iter()
                    .find(|s| &s.approval_id() == id)
                    .ok_or_else(|| ApprovalError::UnknownScreenshot {
                        collection: category.to_string(),
                        html_file_path: id.html_file_path.clone(),
                        user_agent_alias: id.user_agent_alias.clone(),
                    })?;
                seen.insert(id.clone());
                picked.push(screenshot.clone());
            }

            let ids: Vec<ApprovalId> = picked.iter().map(Screenshot::approval_id).collect();
            let (list, id_list) = match category {
                ScreenshotCategory::Changed => (
                    &mut approvals.changed_screenshot_list,
                    &mut approvals.changed_screenshot_ids,
                ),
                ScreenshotCategory::Added => (
                    &mut approvals.added_screenshot_list,
                    &mut approvals.added_screenshot_ids,
                ),
                _ => (
                    &mut approvals.removed_screenshot_list,
                    &mut approvals.removed_screenshot_ids,
                ),
            };
            *list = picked;
            *id_list = ids;
        }

        tracing::info!(
            changed = approvals.changed_screenshot_list.len(),
            added = approvals.added_screenshot_list.len(),
            removed = approvals.removed_screenshot_list.len(),
            "approvals resolved"
        );
        Ok(approvals)
    }
}
