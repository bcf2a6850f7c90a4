//! Screenshot Report - review and approval tooling for visual regression runs.
//!
//! This crate provides:
//! - The report data model with protobuf and JSON codecs plus verification
//! - The golden file format and approval write-back
//! - A review controller with tri-state selection and approve/retry commands
//! - A terminal front end for the review controller
//! - Pixel diffing of expected and actual screenshots
//!
//! # Example
//!
//! ```rust,no_run
//! use screenshot_report::config::ScriptSettings;
//! use screenshot_report::loader::ReportSource;
//! use screenshot_report::review::ReportUi;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let source = ReportSource::parse("https://storage.example.com/run-42/report.json");
//! let mut ui = ReportUi::initialize(&source, ScriptSettings::default()).await?;
//! ui.toggle_collection("changed", true);
//! if let Some(command) = ui.approve_selected() {
//!     println!("{command}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod approval;
pub mod config;
pub mod diff;
pub mod loader;
pub mod review;
pub mod schema;

// Re-export schema types
pub use schema::{
    Approvals, GoldenSuite, ReportData, ReportMessage, SchemaError, SchemaResult, Screenshot,
    ScreenshotCategory, Screenshots, Verify,
};

// Re-export loading
pub use loader::{LoadError, LoadResult, ReportFormat, ReportSource, fetch_report};

// Re-export review controller
pub use review::{CliCommand, ReportUi, ReviewError, ReviewResult, ReviewState, UiState};

// Re-export approval and diff
pub use approval::{ApprovalError, ApprovalResult, ApproveSelection};
pub use diff::{DiffError, DiffResult, compare_images};
