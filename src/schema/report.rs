//! Report messages produced by a screenshot test run.
//!
//! Field tags are part of the binary format and must not be renumbered.
//! Messages are declared directly with prost derives; there is no `.proto`
//! file or build step.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::codec::{
    Verify, capture_state, child_path, git_revision_type, inclusion_type, u64_string, verify_all,
    verify_enum, verify_opt,
};
use super::types::{CaptureState, GitRevisionType, InclusionType, SchemaError, SchemaResult};

/// Root of a report
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportData {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ReportMeta>,

    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agents: Option<UserAgents>,

    #[prost(message, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshots: Option<Screenshots>,

    #[prost(message, optional, tag = "4")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approvals: Option<Approvals>,
}

impl ReportData {
    /// Public URL of the report's own JSON file (the `--report=` value)
    pub fn report_json_url(&self) -> &str {
        self.meta
            .as_ref()
            .and_then(|m| m.report_json_file.as_ref())
            .map(|f| f.public_url.as_str())
            .unwrap_or("")
    }

    /// Screenshots aggregate, or an empty one
    pub fn screenshots_or_default(&self) -> Screenshots {
        self.screenshots.clone().unwrap_or_default()
    }
}

/// Run metadata
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportMeta {
    #[prost(uint64, tag = "1")]
    #[serde(with = "u64_string")]
    pub start_time_utc_ms: u64,

    #[prost(uint64, tag = "2")]
    #[serde(with = "u64_string")]
    pub end_time_utc_ms: u64,

    #[prost(uint64, tag = "3")]
    #[serde(with = "u64_string")]
    pub duration_ms: u64,

    #[prost(string, tag = "4")]
    pub local_asset_base_dir: String,

    #[prost(string, tag = "5")]
    pub local_screenshot_image_base_dir: String,

    #[prost(string, tag = "6")]
    pub local_diff_image_base_dir: String,

    #[prost(string, tag = "7")]
    pub local_report_base_dir: String,

    #[prost(string, tag = "8")]
    pub remote_upload_base_dir: String,

    #[prost(string, tag = "9")]
    pub remote_upload_base_url: String,

    #[prost(string, tag = "10")]
    pub cli_invocation: String,

    #[prost(message, optional, tag = "11")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,

    #[prost(message, optional, tag = "12")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_version: Option<LibraryVersion>,

    #[prost(message, optional, tag = "13")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npm_version: Option<LibraryVersion>,

    #[prost(message, optional, tag = "14")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<LibraryVersion>,

    #[prost(message, optional, tag = "15")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_html_file: Option<TestFile>,

    #[prost(message, optional, tag = "16")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_json_file: Option<TestFile>,

    #[prost(message, optional, tag = "17")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub golden_diff_base: Option<DiffBase>,
}

impl ReportMeta {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(i64::try_from(self.start_time_utc_ms).ok()?)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(i64::try_from(self.end_time_utc_ms).ok()?)
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// A file with its local and public locations
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct TestFile {
    #[prost(string, tag = "1")]
    pub relative_path: String,

    #[prost(string, tag = "2")]
    pub absolute_path: String,

    #[prost(string, tag = "3")]
    pub public_url: String,
}

/// The person who invoked the run
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[prost(string, tag = "1")]
    pub name: String,

    #[prost(string, tag = "2")]
    pub email: String,

    #[prost(string, tag = "3")]
    pub username: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryVersion {
    #[prost(string, tag = "1")]
    pub version_string: String,

    /// Commits since the tagged release
    #[prost(uint32, tag = "2")]
    pub commit_offset: u32,
}

/// Baseline the run is compared against
///
/// In the plain-object form the three branches are separate keys; an object
/// with more than one of them set is rejected.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(try_from = "DiffBaseObject", into = "DiffBaseObject")]
pub struct DiffBase {
    /// Raw value given on the command line
    #[prost(string, tag = "1")]
    pub input_string: String,

    #[prost(oneof = "diff_base::Value", tags = "2, 3, 4")]
    pub value: Option<diff_base::Value>,
}

pub mod diff_base {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Value {
        #[prost(string, tag = "2")]
        FilePath(String),

        #[prost(string, tag = "3")]
        PublicUrl(String),

        #[prost(message, tag = "4")]
        GitRevision(super::GitRevision),
    }
}

/// Plain-object form of [`DiffBase`], one key per oneof branch
#[derive(Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffBaseObject {
    pub input_string: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_revision: Option<GitRevision>,
}

impl TryFrom<DiffBaseObject> for DiffBase {
    type Error = String;

    fn try_from(obj: DiffBaseObject) -> Result<Self, Self::Error> {
        let mut set: Vec<&str> = Vec::new();
        if obj.file_path.is_some() {
            set.push("file_path");
        }
        if obj.public_url.is_some() {
            set.push("public_url");
        }
        if obj.git_revision.is_some() {
            set.push("git_revision");
        }
        if set.len() > 1 {
            return Err(format!(
                "DiffBase.value: multiple values set ({})",
                set.join(", ")
            ));
        }

        let value = if let Some(path) = obj.file_path {
            Some(diff_base::Value::FilePath(path))
        } else if let Some(url) = obj.public_url {
            Some(diff_base::Value::PublicUrl(url))
        } else {
            obj.git_revision.map(diff_base::Value::GitRevision)
        };

        Ok(DiffBase {
            input_string: obj.input_string,
            value,
        })
    }
}

impl From<DiffBase> for DiffBaseObject {
    fn from(base: DiffBase) -> Self {
        let mut obj = DiffBaseObject {
            input_string: base.input_string,
            ..Default::default()
        };
        match base.value {
            Some(diff_base::Value::FilePath(path)) => obj.file_path = Some(path),
            Some(diff_base::Value::PublicUrl(url)) => obj.public_url = Some(url),
            Some(diff_base::Value::GitRevision(rev)) => obj.git_revision = Some(rev),
            None => {}
        }
        obj
    }
}

/// A git revision used as the diff base
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GitRevision {
    #[prost(enumeration = "GitRevisionType", tag = "1")]
    #[serde(with = "git_revision_type")]
    pub r#type: i32,

    #[prost(string, tag = "2")]
    pub commit: String,

    #[prost(string, tag = "3")]
    pub remote: String,

    #[prost(string, tag = "4")]
    pub branch: String,

    #[prost(string, tag = "5")]
    pub tag: String,

    /// Pre-fetched golden snapshot for this revision
    #[prost(string, tag = "6")]
    pub snapshot_file_path: String,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAgents {
    #[prost(message, repeated, tag = "1")]
    pub all_user_agents: Vec<UserAgent>,

    #[prost(message, repeated, tag = "2")]
    pub runnable_user_agents: Vec<UserAgent>,

    #[prost(message, repeated, tag = "3")]
    pub skipped_user_agents: Vec<UserAgent>,
}

/// A browser/OS/form-factor combination under test
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct UserAgent {
    /// Machine identifier, e.g. "desktop_windows_chrome@latest"
    #[prost(string, tag = "1")]
    pub alias: String,

    /// Human-readable name
    #[prost(string, tag = "2")]
    pub name: String,

    #[prost(string, tag = "3")]
    pub form_factor: String,

    #[prost(string, tag = "4")]
    pub os_vendor: String,

    #[prost(string, tag = "5")]
    pub browser_vendor: String,

    #[prost(string, tag = "6")]
    pub browser_version_name: String,

    #[prost(string, tag = "7")]
    pub browser_version_value: String,

    #[prost(string, tag = "8")]
    pub browser_icon_url: String,

    #[prost(string, tag = "9")]
    pub image_filename_suffix: String,

    #[prost(message, optional, tag = "10")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_capabilities: Option<Capabilities>,

    #[prost(message, optional, tag = "11")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_capabilities: Option<Capabilities>,

    /// Fingerprint reported by the browser at run time
    #[prost(message, optional, tag = "12")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigator: Option<Navigator>,

    #[prost(bool, tag = "13")]
    pub is_enabled_by_cli: bool,

    #[prost(bool, tag = "14")]
    pub is_available_locally: bool,

    #[prost(bool, tag = "15")]
    pub is_runnable: bool,
}

/// Automation capabilities requested from or granted by a browser driver
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    #[prost(string, tag = "1")]
    pub browser_name: String,

    #[prost(string, tag = "2")]
    pub browser_version: String,

    #[prost(string, tag = "3")]
    pub platform_name: String,

    #[prost(btree_map = "string, string", tag = "4")]
    pub extras: BTreeMap<String, String>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Navigator {
    #[prost(string, tag = "1")]
    pub os_name: String,

    #[prost(string, tag = "2")]
    pub os_version: String,

    #[prost(string, tag = "3")]
    pub browser_name: String,

    #[prost(string, tag = "4")]
    pub browser_version: String,

    #[prost(string, tag = "5")]
    pub form_factor: String,
}

/// One (test page x user agent) capture
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Screenshot {
    #[prost(string, tag = "1")]
    pub html_file_path: String,

    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<UserAgent>,

    #[prost(enumeration = "InclusionType", tag = "3")]
    #[serde(with = "inclusion_type")]
    pub inclusion_type: i32,

    #[prost(enumeration = "CaptureState", tag = "4")]
    #[serde(with = "capture_state")]
    pub capture_state: i32,

    #[prost(message, optional, tag = "5")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_page_file: Option<TestFile>,

    #[prost(message, optional, tag = "6")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_image_file: Option<TestFile>,

    #[prost(message, optional, tag = "7")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_image_file: Option<TestFile>,

    #[prost(message, optional, tag = "8")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_diff_result: Option<ImageDiffResult>,

    #[prost(uint32, tag = "9")]
    pub retry_count: u32,
}

impl Screenshot {
    pub fn user_agent_alias(&self) -> &str {
        self.user_agent
            .as_ref()
            .map(|ua| ua.alias.as_str())
            .unwrap_or("")
    }

    pub fn is_runnable(&self) -> bool {
        self.user_agent.as_ref().is_some_and(|ua| ua.is_runnable)
    }

    pub fn approval_id(&self) -> ApprovalId {
        ApprovalId {
            html_file_path: self.html_file_path.clone(),
            user_agent_alias: self.user_agent_alias().to_string(),
        }
    }
}

/// Outcome of comparing the expected and actual images
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageDiffResult {
    #[prost(message, optional, tag = "1")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_image_file: Option<TestFile>,

    #[prost(message, optional, tag = "2")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_image_file: Option<TestFile>,

    #[prost(message, optional, tag = "3")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_image_file: Option<TestFile>,

    #[prost(uint64, tag = "4")]
    #[serde(with = "u64_string")]
    pub diff_pixel_count: u64,

    #[prost(double, tag = "5")]
    pub diff_pixel_fraction: f64,

    #[prost(bool, tag = "6")]
    pub has_changed: bool,
}

/// A repeated screenshot field usable as a map value
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScreenshotList {
    #[prost(message, repeated, tag = "1")]
    pub screenshots: Vec<Screenshot>,
}

/// Run-level screenshot aggregate
///
/// Each category has a flat list plus two re-indexings of it, keyed by user
/// agent alias and by test page path. The maps hold no data of their own.
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Screenshots {
    #[prost(message, repeated, tag = "1")]
    pub expected_screenshot_list: Vec<Screenshot>,
    #[prost(btree_map = "string, message", tag = "2")]
    pub expected_screenshot_browser_map: BTreeMap<String, ScreenshotList>,
    #[prost(btree_map = "string, message", tag = "3")]
    pub expected_screenshot_page_map: BTreeMap<String, ScreenshotList>,

    #[prost(message, repeated, tag = "4")]
    pub actual_screenshot_list: Vec<Screenshot>,
    #[prost(btree_map = "string, message", tag = "5")]
    pub actual_screenshot_browser_map: BTreeMap<String, ScreenshotList>,
    #[prost(btree_map = "string, message", tag = "6")]
    pub actual_screenshot_page_map: BTreeMap<String, ScreenshotList>,

    #[prost(message, repeated, tag = "7")]
    pub runnable_screenshot_list: Vec<Screenshot>,
    #[prost(btree_map = "string, message", tag = "8")]
    pub runnable_screenshot_browser_map: BTreeMap<String, ScreenshotList>,
    #[prost(btree_map = "string, message", tag = "9")]
    pub runnable_screenshot_page_map: BTreeMap<String, ScreenshotList>,

    #[prost(message, repeated, tag = "10")]
    pub skipped_screenshot_list: Vec<Screenshot>,
    #[prost(btree_map = "string, message", tag = "11")]
    pub skipped_screenshot_browser_map: BTreeMap<String, ScreenshotList>,
    #[prost(btree_map = "string, message", tag = "12")]
    pub skipped_screenshot_page_map: BTreeMap<String, ScreenshotList>,

    #[prost(message, repeated, tag = "13")]
    pub added_screenshot_list: Vec<Screenshot>,
    #[prost(btree_map = "string, message", tag = "14")]
    pub added_screenshot_browser_map: BTreeMap<String, ScreenshotList>,
    #[prost(btree_map = "string, message", tag = "15")]
    pub added_screenshot_page_map: BTreeMap<String, ScreenshotList>,

    #[prost(message, repeated, tag = "16")]
    pub removed_screenshot_list: Vec<Screenshot>,
    #[prost(btree_map = "string, message", tag = "17")]
    pub removed_screenshot_browser_map: BTreeMap<String, ScreenshotList>,
    #[prost(btree_map = "string, message", tag = "18")]
    pub removed_screenshot_page_map: BTreeMap<String, ScreenshotList>,

    #[prost(message, repeated, tag = "19")]
    pub comparable_screenshot_list: Vec<Screenshot>,
    #[prost(btree_map = "string, message", tag = "20")]
    pub comparable_screenshot_browser_map: BTreeMap<String, ScreenshotList>,
    #[prost(btree_map = "string, message", tag = "21")]
    pub comparable_screenshot_page_map: BTreeMap<String, ScreenshotList>,

    #[prost(message, repeated, tag = "22")]
    pub changed_screenshot_list: Vec<Screenshot>,
    #[prost(btree_map = "string, message", tag = "23")]
    pub changed_screenshot_browser_map: BTreeMap<String, ScreenshotList>,
    #[prost(btree_map = "string, message", tag = "24")]
    pub changed_screenshot_page_map: BTreeMap<String, ScreenshotList>,

    #[prost(message, repeated, tag = "25")]
    pub unchanged_screenshot_list: Vec<Screenshot>,
    #[prost(btree_map = "string, message", tag = "26")]
    pub unchanged_screenshot_browser_map: BTreeMap<String, ScreenshotList>,
    #[prost(btree_map = "string, message", tag = "27")]
    pub unchanged_screenshot_page_map: BTreeMap<String, ScreenshotList>,
}

/// One of the nine screenshot categories of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScreenshotCategory {
    Expected,
    Actual,
    Runnable,
    Skipped,
    Added,
    Removed,
    Comparable,
    Changed,
    Unchanged,
}

impl ScreenshotCategory {
    pub const ALL: [ScreenshotCategory; 9] = [
        ScreenshotCategory::Expected,
        ScreenshotCategory::Actual,
        ScreenshotCategory::Runnable,
        ScreenshotCategory::Skipped,
        ScreenshotCategory::Added,
        ScreenshotCategory::Removed,
        ScreenshotCategory::Comparable,
        ScreenshotCategory::Changed,
        ScreenshotCategory::Unchanged,
    ];

    /// Categories a reviewer can approve, in display order
    pub const APPROVABLE: [ScreenshotCategory; 3] = [
        ScreenshotCategory::Changed,
        ScreenshotCategory::Added,
        ScreenshotCategory::Removed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenshotCategory::Expected => "expected",
            ScreenshotCategory::Actual => "actual",
            ScreenshotCategory::Runnable => "runnable",
            ScreenshotCategory::Skipped => "skipped",
            ScreenshotCategory::Added => "added",
            ScreenshotCategory::Removed => "removed",
            ScreenshotCategory::Comparable => "comparable",
            ScreenshotCategory::Changed => "changed",
            ScreenshotCategory::Unchanged => "unchanged",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == name)
    }
}

impl std::fmt::Display for ScreenshotCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

type CategoryParts<'a> = (
    &'a Vec<Screenshot>,
    &'a BTreeMap<String, ScreenshotList>,
    &'a BTreeMap<String, ScreenshotList>,
);

type CategoryPartsMut<'a> = (
    &'a mut Vec<Screenshot>,
    &'a mut BTreeMap<String, ScreenshotList>,
    &'a mut BTreeMap<String, ScreenshotList>,
);

impl Screenshots {
    fn parts(&self, category: ScreenshotCategory) -> CategoryParts<'_> {
        use ScreenshotCategory::*;
        match category {
            Expected => (
                &self.expected_screenshot_list,
                &self.expected_screenshot_browser_map,
                &self.expected_screenshot_page_map,
            ),
            Actual => (
                &self.actual_screenshot_list,
                &self.actual_screenshot_browser_map,
                &self.actual_screenshot_page_map,
            ),
            Runnable => (
                &self.runnable_screenshot_list,
                &self.runnable_screenshot_browser_map,
                &self.runnable_screenshot_page_map,
            ),
            Skipped => (
                &self.skipped_screenshot_list,
                &self.skipped_screenshot_browser_map,
                &self.skipped_screenshot_page_map,
            ),
            Added => (
                &self.added_screenshot_list,
                &self.added_screenshot_browser_map,
                &self.added_screenshot_page_map,
            ),
            Removed => (
                &self.removed_screenshot_list,
                &self.removed_screenshot_browser_map,
                &self.removed_screenshot_page_map,
            ),
            Comparable => (
                &self.comparable_screenshot_list,
                &self.comparable_screenshot_browser_map,
                &self.comparable_screenshot_page_map,
            ),
            Changed => (
                &self.changed_screenshot_list,
                &self.changed_screenshot_browser_map,
                &self.changed_screenshot_page_map,
            ),
            Unchanged => (
                &self.unchanged_screenshot_list,
                &self.unchanged_screenshot_browser_map,
                &self.unchanged_screenshot_page_map,
            ),
        }
    }

    fn parts_mut(&mut self, category: ScreenshotCategory) -> CategoryPartsMut<'_> {
        use ScreenshotCategory::*;
        match category {
            Expected => (
                &mut self.expected_screenshot_list,
                &mut self.expected_screenshot_browser_map,
                &mut self.expected_screenshot_page_map,
            ),
            Actual => (
                &mut self.actual_screenshot_list,
                &mut self.actual_screenshot_browser_map,
                &mut self.actual_screenshot_page_map,
            ),
            Runnable => (
                &mut self.runnable_screenshot_list,
                &mut self.runnable_screenshot_browser_map,
                &mut self.runnable_screenshot_page_map,
            ),
            Skipped => (
                &mut self.skipped_screenshot_list,
                &mut self.skipped_screenshot_browser_map,
                &mut self.skipped_screenshot_page_map,
            ),
            Added => (
                &mut self.added_screenshot_list,
                &mut self.added_screenshot_browser_map,
                &mut self.added_screenshot_page_map,
            ),
            Removed => (
                &mut self.removed_screenshot_list,
                &mut self.removed_screenshot_browser_map,
                &mut self.removed_screenshot_page_map,
            ),
            Comparable => (
                &mut self.comparable_screenshot_list,
                &mut self.comparable_screenshot_browser_map,
                &mut self.comparable_screenshot_page_map,
            ),
            Changed => (
                &mut self.changed_screenshot_list,
                &mut self.changed_screenshot_browser_map,
                &mut self.changed_screenshot_page_map,
            ),
            Unchanged => (
                &mut self.unchanged_screenshot_list,
                &mut self.unchanged_screenshot_browser_map,
                &mut self.unchanged_screenshot_page_map,
            ),
        }
    }

    pub fn list(&self, category: ScreenshotCategory) -> &[Screenshot] {
        self.parts(category).0
    }

    /// Screenshots of a category keyed by user agent alias
    pub fn browser_map(&self, category: ScreenshotCategory) -> &BTreeMap<String, ScreenshotList> {
        self.parts(category).1
    }

    /// Screenshots of a category keyed by test page path
    pub fn page_map(&self, category: ScreenshotCategory) -> &BTreeMap<String, ScreenshotList> {
        self.parts(category).2
    }

    /// Append a screenshot to a category, keeping both indexes in step
    pub fn push(&mut self, category: ScreenshotCategory, screenshot: Screenshot) {
        let (list, by_browser, by_page) = self.parts_mut(category);
        by_browser
            .entry(screenshot.user_agent_alias().to_string())
            .or_default()
            .screenshots
            .push(screenshot.clone());
        by_page
            .entry(screenshot.html_file_path.clone())
            .or_default()
            .screenshots
            .push(screenshot.clone());
        list.push(screenshot);
    }

    /// Regenerate every by-browser and by-page map from the flat lists
    pub fn rebuild_indexes(&mut self) {
        for category in ScreenshotCategory::ALL {
            let (list, by_browser, by_page) = self.parts_mut(category);
            by_browser.clear();
            by_page.clear();
            for screenshot in list.iter() {
                by_browser
                    .entry(screenshot.user_agent_alias().to_string())
                    .or_default()
                    .screenshots
                    .push(screenshot.clone());
                by_page
                    .entry(screenshot.html_file_path.clone())
                    .or_default()
                    .screenshots
                    .push(screenshot.clone());
            }
        }
    }

    /// Check that every map, flattened, holds exactly the screenshots of its list
    pub fn check_indexes(&self) -> SchemaResult<()> {
        for category in ScreenshotCategory::ALL {
            let (list, by_browser, by_page) = self.parts(category);
            check_index(list, by_browser, &format!("{}_screenshot_browser_map", category))?;
            check_index(list, by_page, &format!("{}_screenshot_page_map", category))?;
        }
        Ok(())
    }
}

fn check_index(
    list: &[Screenshot],
    index: &BTreeMap<String, ScreenshotList>,
    name: &str,
) -> SchemaResult<()> {
    let flattened: Vec<&Screenshot> = index.values().flat_map(|l| l.screenshots.iter()).collect();
    if flattened.len() != list.len() {
        return Err(SchemaError::IndexMismatch {
            index: name.to_string(),
            message: format!(
                "{} screenshots in map, {} in list",
                flattened.len(),
                list.len()
            ),
        });
    }

    // Multiset comparison: each list entry claims one equal, unclaimed map entry
    let mut claimed = vec![false; flattened.len()];
    for screenshot in list {
        let slot = flattened
            .iter()
            .enumerate()
            .position(|(i, s)| !claimed[i] && *s == screenshot);
        match slot {
            Some(i) => claimed[i] = true,
            None => {
                return Err(SchemaError::IndexMismatch {
                    index: name.to_string(),
                    message: format!(
                        "{} @ {} is missing",
                        screenshot.html_file_path,
                        screenshot.user_agent_alias()
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Screenshots a human accepted as intentional changes
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct Approvals {
    #[prost(message, repeated, tag = "1")]
    pub changed_screenshot_list: Vec<Screenshot>,

    #[prost(message, repeated, tag = "2")]
    pub added_screenshot_list: Vec<Screenshot>,

    #[prost(message, repeated, tag = "3")]
    pub removed_screenshot_list: Vec<Screenshot>,

    #[prost(message, repeated, tag = "4")]
    pub changed_screenshot_ids: Vec<ApprovalId>,

    #[prost(message, repeated, tag = "5")]
    pub added_screenshot_ids: Vec<ApprovalId>,

    #[prost(message, repeated, tag = "6")]
    pub removed_screenshot_ids: Vec<ApprovalId>,
}

impl Approvals {
    pub fn len(&self) -> usize {
        self.changed_screenshot_list.len()
            + self.added_screenshot_list.len()
            + self.removed_screenshot_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalId {
    #[prost(string, tag = "1")]
    pub html_file_path: String,

    #[prost(string, tag = "2")]
    pub user_agent_alias: String,
}

// ============================================================================
// Verification
// ============================================================================

macro_rules! verify_leaf {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Verify for $ty {
                fn verify_at(&self, _path: &str) -> SchemaResult<()> {
                    Ok(())
                }
            }
        )*
    };
}

verify_leaf!(
    TestFile,
    User,
    LibraryVersion,
    Capabilities,
    Navigator,
    ApprovalId,
    UserAgent
);

impl Verify for ReportData {
    fn verify_at(&self, path: &str) -> SchemaResult<()> {
        verify_opt(&self.meta, path, "meta")?;
        verify_opt(&self.user_agents, path, "user_agents")?;
        verify_opt(&self.screenshots, path, "screenshots")?;
        verify_opt(&self.approvals, path, "approvals")
    }
}

impl Verify for ReportMeta {
    fn verify_at(&self, path: &str) -> SchemaResult<()> {
        verify_opt(&self.golden_diff_base, path, "golden_diff_base")
    }
}

impl Verify for DiffBase {
    fn verify_at(&self, path: &str) -> SchemaResult<()> {
        match &self.value {
            Some(diff_base::Value::GitRevision(rev)) => {
                rev.verify_at(&child_path(path, "git_revision"))
            }
            _ => Ok(()),
        }
    }
}

impl Verify for GitRevision {
    fn verify_at(&self, path: &str) -> SchemaResult<()> {
        verify_enum::<GitRevisionType>(self.r#type, path, "type")
    }
}

impl Verify for UserAgents {
    fn verify_at(&self, path: &str) -> SchemaResult<()> {
        verify_all(&self.all_user_agents, path, "all_user_agents")?;
        verify_all(&self.runnable_user_agents, path, "runnable_user_agents")?;
        verify_all(&self.skipped_user_agents, path, "skipped_user_agents")
    }
}

impl Verify for Screenshot {
    fn verify_at(&self, path: &str) -> SchemaResult<()> {
        verify_enum::<InclusionType>(self.inclusion_type, path, "inclusion_type")?;
        verify_enum::<CaptureState>(self.capture_state, path, "capture_state")?;
        verify_opt(&self.user_agent, path, "user_agent")?;
        verify_opt(&self.image_diff_result, path, "image_diff_result")
    }
}

impl Verify for ImageDiffResult {
    fn verify_at(&self, path: &str) -> SchemaResult<()> {
        if !(0.0..=1.0).contains(&self.diff_pixel_fraction) {
            return Err(SchemaError::verify(
                child_path(path, "diff_pixel_fraction"),
                format!("{} is outside 0..=1", self.diff_pixel_fraction),
            ));
        }
        Ok(())
    }
}

impl Verify for ScreenshotList {
    fn verify_at(&self, path: &str) -> SchemaResult<()> {
        for (i, screenshot) in self.screenshots.iter().enumerate() {
            screenshot.verify_at(&format!("{}[{}]", path, i))?;
        }
        Ok(())
    }
}

impl Verify for Screenshots {
    fn verify_at(&self, path: &str) -> SchemaResult<()> {
        for category in ScreenshotCategory::ALL {
            let (list, by_browser, by_page) = self.parts(category);
            verify_all(list, path, &format!("{}_screenshot_list", category))?;
            for (key, entries) in by_browser {
                let field = format!("{}_screenshot_browser_map[{}]", category, key);
                entries.verify_at(&child_path(path, &field))?;
            }
            for (key, entries) in by_page {
                let field = format!("{}_screenshot_page_map[{}]", category, key);
                entries.verify_at(&child_path(path, &field))?;
            }
        }
        Ok(())
    }
}

impl Verify for Approvals {
    fn verify_at(&self, path: &str) -> SchemaResult<()> {
        verify_all(&self.changed_screenshot_list, path, "changed_screenshot_list")?;
        verify_all(&self.added_screenshot_list, path, "added_screenshot_list")?;
        verify_all(&self.removed_screenshot_list, path, "removed_screenshot_list")
    }
}
