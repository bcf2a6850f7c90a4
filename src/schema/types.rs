// Core enums and error types for the report schema

use thiserror::Error;

/// Why a screenshot is or isn't part of a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum InclusionType {
    Unknown = 0,
    Add = 1,
    Skip = 2,
    Remove = 3,
    Compare = 4,
}

/// Lifecycle progress of a single screenshot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum CaptureState {
    Unknown = 0,
    Queued = 1,
    Skipped = 2,
    Running = 3,
    Captured = 4,
    Diffed = 5,
}

/// How a git diff base was specified on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum GitRevisionType {
    Unknown = 0,
    Commit = 1,
    LocalBranch = 2,
    RemoteBranch = 3,
    RemoteTag = 4,
}

/// Schema enums that are written to JSON by name
pub trait NamedEnum: Sized + Copy + 'static {
    /// Name of the enum, used in error messages
    const TYPE_NAME: &'static str;

    /// All variants, in tag order
    fn variants() -> &'static [Self];

    /// Wire name of the variant (e.g. "COMPARE")
    fn as_str_name(&self) -> &'static str;

    /// Numeric tag of the variant
    fn tag(&self) -> i32;

    /// Look up a variant by its wire name
    fn from_str_name(name: &str) -> Option<Self> {
        Self::variants()
            .iter()
            .copied()
            .find(|v| v.as_str_name() == name)
    }

    /// Look up a variant by its numeric tag
    fn from_tag(tag: i32) -> Option<Self> {
        Self::variants().iter().copied().find(|v| v.tag() == tag)
    }
}

impl NamedEnum for InclusionType {
    const TYPE_NAME: &'static str = "InclusionType";

    fn variants() -> &'static [Self] {
        &[
            InclusionType::Unknown,
            InclusionType::Add,
            InclusionType::Skip,
            InclusionType::Remove,
            InclusionType::Compare,
        ]
    }

    fn as_str_name(&self) -> &'static str {
        match self {
            InclusionType::Unknown => "UNKNOWN",
            InclusionType::Add => "ADD",
            InclusionType::Skip => "SKIP",
            InclusionType::Remove => "REMOVE",
            InclusionType::Compare => "COMPARE",
        }
    }

    fn tag(&self) -> i32 {
        *self as i32
    }
}

impl NamedEnum for CaptureState {
    const TYPE_NAME: &'static str = "CaptureState";

    fn variants() -> &'static [Self] {
        &[
            CaptureState::Unknown,
            CaptureState::Queued,
            CaptureState::Skipped,
            CaptureState::Running,
            CaptureState::Captured,
            CaptureState::Diffed,
        ]
    }

    fn as_str_name(&self) -> &'static str {
        match self {
            CaptureState::Unknown => "UNKNOWN",
            CaptureState::Queued => "QUEUED",
            CaptureState::Skipped => "SKIPPED",
            CaptureState::Running => "RUNNING",
            CaptureState::Captured => "CAPTURED",
            CaptureState::Diffed => "DIFFED",
        }
    }

    fn tag(&self) -> i32 {
        *self as i32
    }
}

impl NamedEnum for GitRevisionType {
    const TYPE_NAME: &'static str = "GitRevisionType";

    fn variants() -> &'static [Self] {
        &[
            GitRevisionType::Unknown,
            GitRevisionType::Commit,
            GitRevisionType::LocalBranch,
            GitRevisionType::RemoteBranch,
            GitRevisionType::RemoteTag,
        ]
    }

    fn as_str_name(&self) -> &'static str {
        match self {
            GitRevisionType::Unknown => "UNKNOWN",
            GitRevisionType::Commit => "COMMIT",
            GitRevisionType::LocalBranch => "LOCAL_BRANCH",
            GitRevisionType::RemoteBranch => "REMOTE_BRANCH",
            GitRevisionType::RemoteTag => "REMOTE_TAG",
        }
    }

    fn tag(&self) -> i32 {
        *self as i32
    }
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Error types for schema operations
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Truncated or malformed protobuf bytes
    #[error("Decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Malformed JSON, or a plain object that does not fit the schema
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A decoded value failed verification
    #[error("Verify error at {path}: {message}")]
    Verify { path: String, message: String },

    /// A redundant screenshot index disagrees with its flat list
    #[error("Index mismatch in {index}: {message}")]
    IndexMismatch { index: String, message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaError {
    pub(crate) fn verify(path: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Verify {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_names_round_trip() {
        for v in InclusionType::variants() {
            assert_eq!(InclusionType::from_str_name(v.as_str_name()), Some(*v));
        }
        assert_eq!(
            CaptureState::from_str_name("DIFFED"),
            Some(CaptureState::Diffed)
        );
        assert_eq!(
            GitRevisionType::from_str_name("REMOTE_TAG"),
            Some(GitRevisionType::RemoteTag)
        );
        assert_eq!(InclusionType::from_str_name("compare"), None);
    }

    #[test]
    fn test_enum_tags() {
        assert_eq!(InclusionType::from_tag(4), Some(InclusionType::Compare));
        assert_eq!(CaptureState::from_tag(6), None);
        assert!(CaptureState::is_valid(5));
        assert!(!InclusionType::is_valid(9));
    }
}
