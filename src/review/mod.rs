//! Interactive review of a screenshot report.
//!
//! Items form a three-level tree (collection, page, user agent). Checkbox
//! display, status badges and toolbar enablement are all derived from the
//! flat item list by a single recompute pass.

pub mod command;
pub mod controller;
pub mod state;
pub mod tui;
pub mod types;
pub mod view;

pub use command::{CliCommand, approve_command_args, retry_command_args};
pub use controller::{Disclosure, ReportUi};
pub use state::{CollectionState, PageState, Partition, ReviewState, ToolbarState, UiState};
pub use types::{
    CheckboxState, ItemKey, ReviewError, ReviewItem, ReviewResult, ReviewStatus, StatusBadge,
};
pub use view::{LineStyle, RowTarget, ViewLine, render_lines};
