//! Text projection of the controller state.
//!
//! The view never changes state; the terminal loop redraws from
//! [`render_lines`] after every operation.

use super::controller::ReportUi;
use super::state::ToolbarState;
use super::types::{CheckboxState, ItemKey, ReviewItem, StatusBadge};
use crate::schema::TestFile;

/// What activating a line acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowTarget {
    Collection(String),
    Page { collection: String, html_file_path: String },
    UserAgent(ItemKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Header,
    Toolbar,
    Collection,
    Page,
    UserAgent,
    Disabled,
    Detail,
    Modal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLine {
    pub text: String,
    pub style: LineStyle,
    pub target: Option<RowTarget>,
}

impl ViewLine {
    fn plain(text: impl Into<String>, style: LineStyle) -> Self {
        Self {
            text: text.into(),
            style,
            target: None,
        }
    }

    fn row(text: String, style: LineStyle, target: RowTarget) -> Self {
        Self {
            text,
            style,
            target: Some(target),
        }
    }
}

pub fn checkbox_marker(checkbox: Option<CheckboxState>) -> &'static str {
    match checkbox {
        None => "[/]",
        Some(CheckboxState { indeterminate: true, .. }) => "[-]",
        Some(CheckboxState { checked: true, .. }) => "[x]",
        Some(_) => "[ ]",
    }
}

fn toolbar_line(toolbar: &ToolbarState) -> String {
    let button = |key: &str, label: &str, enabled: bool| {
        if enabled {
            format!("[{key}] {label}")
        } else {
            format!(" -  {label}")
        }
    };
    [
        button("a", "all", toolbar.select_all_enabled),
        button("n", "none", toolbar.select_none_enabled),
        button("i", "invert", toolbar.select_inverse_enabled),
        button("A", "approve", toolbar.approve_enabled),
        button("R", "retry", toolbar.retry_enabled),
        format!("{} selected", toolbar.selected_count),
    ]
    .join("  ")
}

/// Items grouped as collection -> page -> items, in first-seen order
fn group_items(items: &[ReviewItem]) -> Vec<(&str, Vec<(&str, Vec<&ReviewItem>)>)> {
    let mut groups: Vec<(&str, Vec<(&str, Vec<&ReviewItem>)>)> = Vec::new();
    for item in items {
        let collection = match groups.iter().position(|(c, _)| *c == item.key.collection) {
            Some(i) => i,
            None => {
                groups.push((item.key.collection.as_str(), Vec::new()));
                groups.len() - 1
            }
        };
        let pages = &mut groups[collection].1;
        match pages.iter_mut().find(|(p, _)| *p == item.key.html_file_path) {
            Some((_, page_items)) => page_items.push(item),
            None => pages.push((item.key.html_file_path.as_str(), vec![item])),
        }
    }
    groups
}

fn detail_line(label: &str, file: Option<&TestFile>) -> Option<ViewLine> {
    let file = file?;
    let location = if file.public_url.is_empty() {
        &file.relative_path
    } else {
        &file.public_url
    };
    Some(ViewLine::plain(format!("        {label}: {location}"), LineStyle::Detail))
}

/// Project the controller into display lines
pub fn render_lines(ui: &ReportUi) -> Vec<ViewLine> {
    let ui_state = ui.ui_state();
    let disclosure = ui.disclosure();
    let mut lines = vec![ViewLine::plain(
        format!("Screenshot report {}", ui.report().report_json_url()).trim_end().to_string(),
        LineStyle::Header,
    )];

    if ui_state.toolbar.hidden {
        lines.push(ViewLine::plain("Nothing to review", LineStyle::Header));
    } else {
        lines.push(ViewLine::plain(toolbar_line(&ui_state.toolbar), LineStyle::Toolbar));
    }

    for (collection, pages) in group_items(ui.state().items()) {
        let collection_state = ui_state.collection(collection);
        let count: usize = pages.iter().map(|(_, items)| items.len()).sum();
        let badge = collection_state.map(|c| c.badge.text()).unwrap_or("");
        let fold = if disclosure.is_collection_collapsed(collection) { "+" } else { "v" };
        lines.push(ViewLine::row(
            format!(
                "{fold} {} {collection} ({count}) {badge}",
                checkbox_marker(collection_state.map(|c| c.checkbox))
            )
            .trim_end()
            .to_string(),
            LineStyle::Collection,
            RowTarget::Collection(collection.to_string()),
        ));
        if disclosure.is_collection_collapsed(collection) {
            continue;
        }

        for (page, items) in pages {
            let page_state = collection_state.and_then(|c| c.page(page));
            let badge = page_state.map(|p| p.badge.text()).unwrap_or("");
            let fold = if disclosure.is_page_collapsed(collection, page) { "+" } else { "v" };
            lines.push(ViewLine::row(
                format!(
                    "  {fold} {} {page} {badge}",
                    checkbox_marker(page_state.map(|p| p.checkbox))
                )
                .trim_end()
                .to_string(),
                LineStyle::Page,
                RowTarget::Page {
                    collection: collection.to_string(),
                    html_file_path: page.to_string(),
                },
            ));
            if disclosure.is_page_collapsed(collection, page) {
                continue;
            }

            for item in items {
                let (marker, style, status) = if item.disabled {
                    ("[/]", LineStyle::Disabled, "not runnable")
                } else {
                    (
                        checkbox_marker(Some(CheckboxState::from_partition(
                            usize::from(item.checked),
                            usize::from(!item.checked),
                        ))),
                        LineStyle::UserAgent,
                        StatusBadge::Status(item.review_status).text(),
                    )
                };
                lines.push(ViewLine::row(
                    format!("      {marker} {} {status}", item.key.user_agent_alias),
                    style,
                    RowTarget::UserAgent(item.key.clone()),
                ));

                if !disclosure.images_expanded {
                    continue;
                }
                if let Some(screenshot) = ui.screenshot(&item.key) {
                    let diff = screenshot.image_diff_result.as_ref();
                    lines.extend(detail_line("expected", screenshot.expected_image_file.as_ref()));
                    lines.extend(detail_line("actual", screenshot.actual_image_file.as_ref()));
                    lines.extend(detail_line(
                        "diff",
                        diff.and_then(|d| d.diff_image_file.as_ref()),
                    ));
                    if let Some(diff) = diff {
                        lines.push(ViewLine::plain(
                            format!(
                                "        changed pixels: {} ({:.4}%)",
                                diff.diff_pixel_count,
                                diff.diff_pixel_fraction * 100.0
                            ),
                            LineStyle::Detail,
                        ));
                    }
                }
            }
        }
    }

    if let Some(command) = ui.modal() {
        lines.push(ViewLine::plain("", LineStyle::Modal));
        lines.push(ViewLine::plain("Run this command:", LineStyle::Modal));
        lines.push(ViewLine::plain(format!("  {command}"), LineStyle::Modal));
        lines.push(ViewLine::plain("[Esc] close", LineStyle::Modal));
    }

    lines
}
