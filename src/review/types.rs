use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-screenshot human decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Unreviewed,
    Approve,
    Retry,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Unreviewed => "unreviewed",
            ReviewStatus::Approve => "approve",
            ReviewStatus::Retry => "retry",
        }
    }
}

/// Status shown on a collection or page: the children's common status, or mixed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusBadge {
    Status(ReviewStatus),
    Mixed,
}

impl StatusBadge {
    /// Derive the badge from a status histogram
    pub fn from_counts(counts: &BTreeMap<ReviewStatus, usize>) -> Self {
        let mut present = counts.iter().filter(|(_, n)| **n > 0).map(|(s, _)| *s);
        match (present.next(), present.next()) {
            (Some(status), None) => StatusBadge::Status(status),
            _ => StatusBadge::Mixed,
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            StatusBadge::Status(status) => status.as_str(),
            StatusBadge::Mixed => "mixed",
        }
    }
}

/// Display value of a tri-state checkbox
///
/// `indeterminate` is derived from the children and never set directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckboxState {
    pub checked: bool,
    pub indeterminate: bool,
}

impl CheckboxState {
    pub fn from_partition(num_checked: usize, num_unchecked: usize) -> Self {
        Self {
            checked: num_checked > 0,
            indeterminate: num_checked > 0 && num_unchecked > 0,
        }
    }
}

/// Identity of one user-agent checkbox
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey {
    pub collection: String,
    pub html_file_path: String,
    pub user_agent_alias: String,
}

impl ItemKey {
    pub fn new(
        collection: impl Into<String>,
        html_file_path: impl Into<String>,
        user_agent_alias: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            html_file_path: html_file_path.into(),
            user_agent_alias: user_agent_alias.into(),
        }
    }
}

/// A user-agent checkbox and its review status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewItem {
    pub key: ItemKey,
    pub checked: bool,
    /// Non-runnable user agents cannot be selected
    pub disabled: bool,
    pub review_status: ReviewStatus,
}

impl ReviewItem {
    pub fn new(key: ItemKey) -> Self {
        Self {
            key,
            checked: false,
            disabled: false,
            review_status: ReviewStatus::Unreviewed,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// Result type for review operations
pub type ReviewResult<T> = Result<T, ReviewError>;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Report load failed: {0}")]
    Load(#[from] crate::loader::LoadError),

    /// Terminal setup or drawing failed
    #[error("Terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_from_counts() {
        let mut counts = BTreeMap::new();
        counts.insert(ReviewStatus::Approve, 3);
        assert_eq!(StatusBadge::from_counts(&counts), StatusBadge::Status(ReviewStatus::Approve));
        assert_eq!(StatusBadge::from_counts(&counts).text(), "approve");

        counts.insert(ReviewStatus::Unreviewed, 1);
        assert_eq!(StatusBadge::from_counts(&counts), StatusBadge::Mixed);
        assert_eq!(StatusBadge::Mixed.text(), "mixed");
    }

    #[test]
    fn test_checkbox_from_partition() {
        assert_eq!(
            CheckboxState::from_partition(2, 1),
            CheckboxState { checked: true, indeterminate: true }
        );
        assert_eq!(
            CheckboxState::from_partition(2, 0),
            CheckboxState { checked: true, indeterminate: false }
        );
        assert_eq!(CheckboxState::from_partition(0, 3), CheckboxState::default());
    }
}
