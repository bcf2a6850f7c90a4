//! Selection state of the review UI and its derived display state.
//!
//! `ReviewState` is the system of record: one item per user-agent checkbox.
//! Everything shown for collections, pages and the toolbar is recomputed from
//! it in a single pass by [`ReviewState::recompute`].

use std::collections::BTreeMap;

use serde::Serialize;

use super::types::{CheckboxState, ItemKey, ReviewItem, ReviewStatus, StatusBadge};
use crate::schema::{ReportData, Screenshot, ScreenshotCategory};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewState {
    items: Vec<ReviewItem>,
}

/// Checked/unchecked partition and status histogram of a group of items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub checked: Vec<ItemKey>,
    pub unchecked: Vec<ItemKey>,
    pub status_counts: BTreeMap<ReviewStatus, usize>,
}

impl Partition {
    fn add(&mut self, item: &ReviewItem) {
        if item.checked {
            self.checked.push(item.key.clone());
        } else {
            self.unchecked.push(item.key.clone());
        }
        *self.status_counts.entry(item.review_status).or_insert(0) += 1;
    }

    pub fn checkbox(&self) -> CheckboxState {
        CheckboxState::from_partition(self.checked.len(), self.unchecked.len())
    }

    pub fn badge(&self) -> StatusBadge {
        StatusBadge::from_counts(&self.status_counts)
    }

    pub fn is_all_checked(&self) -> bool {
        self.unchecked.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageState {
    pub html_file_path: String,
    pub checkbox: CheckboxState,
    pub badge: StatusBadge,
    pub partition: Partition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionState {
    pub name: String,
    pub checkbox: CheckboxState,
    pub badge: StatusBadge,
    pub partition: Partition,
    /// Pages in first-seen order
    pub pages: Vec<PageState>,
}

impl CollectionState {
    pub fn page(&self, html_file_path: &str) -> Option<&PageState> {
        self.pages.iter().find(|p| p.html_file_path == html_file_path)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ToolbarState {
    /// No selectable items at all
    pub hidden: bool,
    pub select_all_enabled: bool,
    pub select_none_enabled: bool,
    pub select_inverse_enabled: bool,
    pub approve_enabled: bool,
    pub retry_enabled: bool,
    pub selected_count: usize,
}

/// Derived display state; enabled items only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UiState {
    pub partition: Partition,
    /// Collections in first-seen order
    pub collections: Vec<CollectionState>,
    pub toolbar: ToolbarState,
}

impl UiState {
    pub fn checked(&self) -> &[ItemKey] {
        &self.partition.checked
    }

    pub fn unchecked(&self) -> &[ItemKey] {
        &self.partition.unchecked
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionState> {
        self.collections.iter().find(|c| c.name == name)
    }
}

impl ReviewState {
    pub fn new(items: Vec<ReviewItem>) -> Self {
        Self { items }
    }

    /// One item per approvable screenshot: changed, then added, then removed
    ///
    /// Items come from the flat lists, grouped by page in first-seen order.
    /// The by-page maps are never consulted, so a stale map cannot hide a
    /// screenshot from review.
    pub fn from_report(report: &ReportData) -> Self {
        let screenshots = report.screenshots_or_default();
        let mut items = Vec::new();
        for category in ScreenshotCategory::APPROVABLE {
            let mut pages: Vec<(&str, Vec<&Screenshot>)> = Vec::new();
            for screenshot in screenshots.list(category) {
                match pages
                    .iter_mut()
                    .find(|(page, _)| *page == screenshot.html_file_path)
                {
                    Some((_, group)) => group.push(screenshot),
                    None => pages.push((screenshot.html_file_path.as_str(), vec![screenshot])),
                }
            }
            for screenshot in pages.into_iter().flat_map(|(_, group)| group) {
                let key = ItemKey::new(
                    category.as_str(),
                    screenshot.html_file_path.clone(),
                    screenshot.user_agent_alias(),
                );
                items.push(ReviewItem::new(key).disabled(!screenshot.is_runnable()));
            }
        }
        Self { items }
    }

    pub fn items(&self) -> &[ReviewItem] {
        &self.items
    }

    pub fn item(&self, key: &ItemKey) -> Option<&ReviewItem> {
        self.items.iter().find(|item| &item.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn set_where<F>(&mut self, checked: bool, filter: F)
    where
        F: Fn(&ItemKey) -> bool,
    {
        for item in self.items.iter_mut().filter(|i| !i.disabled && filter(&i.key)) {
            item.checked = checked;
        }
    }

    /// Check or uncheck every item of a collection, overriding individual choices
    pub fn set_collection_checked(&mut self, collection: &str, checked: bool) -> UiState {
        self.set_where(checked, |key| key.collection == collection);
        self.recompute()
    }

    /// Check or uncheck every item of one page within a collection
    pub fn set_page_checked(&mut self, collection: &str, html_file_path: &str, checked: bool) -> UiState {
        self.set_where(checked, |key| {
            key.collection == collection && key.html_file_path == html_file_path
        });
        self.recompute()
    }

    pub fn set_user_agent_checked(&mut self, key: &ItemKey, checked: bool) -> UiState {
        self.set_where(checked, |k| k == key);
        self.recompute()
    }

    pub fn select_all(&mut self) -> UiState {
        self.set_where(true, |_| true);
        self.recompute()
    }

    pub fn select_none(&mut self) -> UiState {
        self.set_where(false, |_| true);
        self.recompute()
    }

    pub fn select_inverse(&mut self) -> UiState {
        for item in self.items.iter_mut().filter(|i| !i.disabled) {
            item.checked = !item.checked;
        }
        self.recompute()
    }

    /// Record a decision on every checked item; returns how many were marked
    pub fn mark_checked(&mut self, status: ReviewStatus) -> usize {
        let mut marked = 0;
        for item in self.items.iter_mut().filter(|i| i.checked && !i.disabled) {
            item.review_status = status;
            marked += 1;
        }
        marked
    }

    /// Single pass over enabled items building every derived value
    pub fn recompute(&self) -> UiState {
        let mut state = UiState::default();

        for item in self.items.iter().filter(|i| !i.disabled) {
            state.partition.add(item);

            let collection_index = match state
                .collections
                .iter()
                .position(|c| c.name == item.key.collection)
            {
                Some(i) => i,
                None => {
                    state.collections.push(CollectionState {
                        name: item.key.collection.clone(),
                        checkbox: CheckboxState::default(),
                        badge: StatusBadge::Mixed,
                        partition: Partition::default(),
                        pages: Vec::new(),
                    });
                    state.collections.len() - 1
                }
            };
            let collection = &mut state.collections[collection_index];
            collection.partition.add(item);

            let page_index = match collection
                .pages
                .iter()
                .position(|p| p.html_file_path == item.key.html_file_path)
            {
                Some(i) => i,
                None => {
                    collection.pages.push(PageState {
                        html_file_path: item.key.html_file_path.clone(),
                        checkbox: CheckboxState::default(),
                        badge: StatusBadge::Mixed,
                        partition: Partition::default(),
                    });
                    collection.pages.len() - 1
                }
            };
            collection.pages[page_index].partition.add(item);
        }

        for collection in &mut state.collections {
            collection.checkbox = collection.partition.checkbox();
            collection.badge = collection.partition.badge();
            for page in &mut collection.pages {
                page.checkbox = page.partition.checkbox();
                page.badge = page.partition.badge();
            }
        }

        let num_checked = state.partition.checked.len();
        let num_unchecked = state.partition.unchecked.len();
        state.toolbar = ToolbarState {
            hidden: num_checked == 0 && num_unchecked == 0,
            select_all_enabled: num_unchecked > 0,
            select_none_enabled: num_checked > 0,
            select_inverse_enabled: num_checked > 0 || num_unchecked > 0,
            approve_enabled: num_checked > 0,
            retry_enabled: num_checked > 0,
            selected_count: num_checked,
        };

        state
    }
}
