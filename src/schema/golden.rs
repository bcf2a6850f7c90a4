//! Persisted baseline (`golden.json`).
//!
//! A flat map from test page path to the approved screenshot URL of every
//! user agent, rewritten after each approval.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::codec::Verify;
use super::report::{Approvals, Screenshot};
use super::types::SchemaResult;

/// Every approved page of a suite, keyed by html file path
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoldenSuite {
    #[prost(btree_map = "string, message", tag = "1")]
    pub pages: BTreeMap<String, GoldenPage>,
}

#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GoldenPage {
    #[prost(string, tag = "1")]
    pub public_url: String,

    /// Approved image URL keyed by user agent alias
    #[prost(btree_map = "string, string", tag = "2")]
    pub screenshots: BTreeMap<String, String>,
}

/// One approved (page, user agent) image
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldenScreenshot {
    #[prost(string, tag = "1")]
    pub html_file_path: String,

    #[prost(string, tag = "2")]
    pub html_file_url: String,

    #[prost(string, tag = "3")]
    pub user_agent_alias: String,

    #[prost(string, tag = "4")]
    pub screenshot_image_url: String,
}

impl Verify for GoldenSuite {
    fn verify_at(&self, _path: &str) -> SchemaResult<()> {
        Ok(())
    }
}

impl Verify for GoldenPage {
    fn verify_at(&self, _path: &str) -> SchemaResult<()> {
        Ok(())
    }
}

impl Verify for GoldenScreenshot {
    fn verify_at(&self, _path: &str) -> SchemaResult<()> {
        Ok(())
    }
}

impl GoldenSuite {
    /// Read a golden file; a missing file is an empty suite
    pub fn load(path: &Path) -> SchemaResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "golden file not found, starting empty");
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Write the suite as pretty JSON with sorted keys
    pub fn save(&self, path: &Path) -> SchemaResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        fs::write(path, json)?;
        tracing::info!(path = %path.display(), pages = self.pages.len(), "wrote golden file");
        Ok(())
    }

    pub fn screenshot_image_url(&self, html_file_path: &str, user_agent_alias: &str) -> Option<&str> {
        self.pages
            .get(html_file_path)
            .and_then(|page| page.screenshots.get(user_agent_alias))
            .map(|url| url.as_str())
    }

    /// Insert or replace one approved image
    pub fn set_screenshot(&mut self, golden: GoldenScreenshot) {
        let page = self.pages.entry(golden.html_file_path).or_default();
        if !golden.html_file_url.is_empty() {
            page.public_url = golden.html_file_url;
        }
        page.screenshots
            .insert(golden.user_agent_alias, golden.screenshot_image_url);
    }

    /// Remove one approved image, dropping the page when it becomes empty
    pub fn remove_screenshot(&mut self, html_file_path: &str, user_agent_alias: &str) -> bool {
        let Some(page) = self.pages.get_mut(html_file_path) else {
            return false;
        };
        let removed = page.screenshots.remove(user_agent_alias).is_some();
        if page.screenshots.is_empty() {
            self.pages.remove(html_file_path);
        }
        removed
    }

    /// Flattened view of every approved image
    pub fn screenshots(&self) -> impl Iterator<Item = GoldenScreenshot> + '_ {
        self.pages.iter().flat_map(|(path, page)| {
            page.screenshots.iter().map(move |(alias, url)| GoldenScreenshot {
                html_file_path: path.clone(),
                html_file_url: page.public_url.clone(),
                user_agent_alias: alias.clone(),
                screenshot_image_url: url.clone(),
            })
        })
    }

    /// Write approved changes into the suite
    ///
    /// Added and changed screenshots take their actual image URL; removed
    /// screenshots are deleted. Returns the number of entries touched.
    pub fn apply_approvals(&mut self, approvals: &Approvals) -> usize {
        let mut touched = 0;
        for screenshot in approvals
            .added_screenshot_list
            .iter()
            .chain(approvals.changed_screenshot_list.iter())
        {
            self.set_screenshot(GoldenScreenshot::from_actual(screenshot));
            touched += 1;
        }
        for screenshot in &approvals.removed_screenshot_list {
            if self.remove_screenshot(&screenshot.html_file_path, screenshot.user_agent_alias()) {
                touched += 1;
            }
        }
        touched
    }
}

impl GoldenScreenshot {
    /// Golden entry pointing at a screenshot's actual image
    pub fn from_actual(screenshot: &Screenshot) -> Self {
        Self {
            html_file_path: screenshot.html_file_path.clone(),
            html_file_url: screenshot
                .test_page_file
                .as_ref()
                .map(|f| f.public_url.clone())
                .unwrap_or_default(),
            user_agent_alias: screenshot.user_agent_alias().to_string(),
            screenshot_image_url: screenshot
                .actual_image_file
                .as_ref()
                .map(|f| f.public_url.clone())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::report::{TestFile, UserAgent};
    use pretty_assertions::assert_eq;

    fn approved(page: &str, alias: &str, image_url: &str) -> Screenshot {
        Screenshot {
            html_file_path: page.to_string(),
            user_agent: Some(UserAgent {
                alias: alias.to_string(),
                ..Default::default()
            }),
            test_page_file: Some(TestFile {
                public_url: format!("https://cdn.example.com/{}", page),
                ..Default::default()
            }),
            actual_image_file: Some(TestFile {
                public_url: image_url.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_golden_json_shape() {
        let json = r#"{
            "button/baseline.html": {
                "publicUrl": "https://cdn.example.com/button/baseline.html",
                "screenshots": {
                    "desktop_windows_chrome@latest": "https://cdn.example.com/chrome.png"
                }
            }
        }"#;
        let suite: GoldenSuite = serde_json::from_str(json).unwrap();
        assert_eq!(
            suite.screenshot_image_url("button/baseline.html", "desktop_windows_chrome@latest"),
            Some("https://cdn.example.com/chrome.png")
        );
        let value = serde_json::to_value(&suite).unwrap();
        assert_eq!(
            value["button/baseline.html"]["publicUrl"],
            "https://cdn.example.com/button/baseline.html"
        );
    }

    #[test]
    fn test_apply_approvals() {
        let mut suite = GoldenSuite::default();
        suite.set_screenshot(GoldenScreenshot {
            html_file_path: "old.html".to_string(),
            html_file_url: "https://cdn.example.com/old.html".to_string(),
            user_agent_alias: "chrome".to_string(),
            screenshot_image_url: "https://cdn.example.com/old-chrome.png".to_string(),
        });
        suite.set_screenshot(GoldenScreenshot {
            html_file_path: "a.html".to_string(),
            html_file_url: String::new(),
            user_agent_alias: "chrome".to_string(),
            screenshot_image_url: "https://cdn.example.com/a-chrome-v1.png".to_string(),
        });

        let approvals = Approvals {
            changed_screenshot_list: vec![approved("a.html", "chrome", "https://cdn.example.com/a-chrome-v2.png")],
            added_screenshot_list: vec![approved("b.html", "firefox", "https://cdn.example.com/b-firefox.png")],
            removed_screenshot_list: vec![approved("old.html", "chrome", "")],
            ..Default::default()
        };

        assert_eq!(suite.apply_approvals(&approvals), 3);
        assert_eq!(
            suite.screenshot_image_url("a.html", "chrome"),
            Some("https://cdn.example.com/a-chrome-v2.png")
        );
        assert_eq!(
            suite.screenshot_image_url("b.html", "firefox"),
            Some("https://cdn.example.com/b-firefox.png")
        );
        assert_eq!(suite.pages["a.html"].public_url, "https://cdn.example.com/a.html");
        assert!(!suite.pages.contains_key("old.html"));
        assert_eq!(suite.screenshots().count(), 2);
    }

    #[test]
    fn test_load_missing_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("golden.json");
        let mut suite = GoldenSuite::load(&path).unwrap();
        assert!(suite.pages.is_empty());

        suite.set_screenshot(GoldenScreenshot {
            html_file_path: "a.html".to_string(),
            html_file_url: "https://cdn.example.com/a.html".to_string(),
            user_agent_alias: "chrome".to_string(),
            screenshot_image_url: "https://cdn.example.com/a.png".to_string(),
        });
        suite.save(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.ends_with('\n'));
        assert_eq!(GoldenSuite::load(&path).unwrap(), suite);
    }
}
