pub mod codec;
pub mod golden;
pub mod report;
pub mod types;

pub use codec::{ReportMessage, Verify};
pub use golden::{GoldenPage, GoldenScreenshot, GoldenSuite};
pub use report::{
    ApprovalId, Approvals, Capabilities, DiffBase, GitRevision, ImageDiffResult, LibraryVersion,
    Navigator, ReportData, ReportMeta, Screenshot, ScreenshotCategory, ScreenshotList, Screenshots,
    TestFile, User, UserAgent, UserAgents, diff_base,
};
pub use types::{CaptureState, GitRevisionType, InclusionType, NamedEnum, SchemaError, SchemaResult};
