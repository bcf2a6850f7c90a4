//! One-shot report loading.
//!
//! A report is read exactly once, from an HTTP(S) URL or from disk. There is
//! no retry and no timeout beyond what the transport imposes.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::schema::{ReportData, ReportMessage, SchemaError};

/// File name the report UI expects next to itself
pub const REPORT_FILE_NAME: &str = "report.json";

/// Result type for report loading
pub type LoadResult<T> = Result<T, LoadError>;

#[derive(Debug, Error)]
pub enum LoadError {
    /// The request could not be sent or its body could not be read
    #[error("Transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The body was not a valid report
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Where a report comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportSource {
    Url(String),
    File(PathBuf),
}

/// Wire form of a report body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Binary,
}

impl ReportSource {
    /// `http(s)://` is a URL, a directory means its `report.json`, anything else is a file
    pub fn parse(input: &str) -> Self {
        if input.starts_with("http://") || input.starts_with("https://") {
            return ReportSource::Url(input.to_string());
        }
        let path = PathBuf::from(input);
        if path.is_dir() {
            ReportSource::File(path.join(REPORT_FILE_NAME))
        } else {
            ReportSource::File(path)
        }
    }

    /// Binary for `.pb`/`.bin` names, JSON otherwise
    pub fn format(&self) -> ReportFormat {
        let name = match self {
            ReportSource::Url(url) => url.split(['?', '#']).next().unwrap_or(url).to_string(),
            ReportSource::File(path) => path.to_string_lossy().to_string(),
        };
        if name.ends_with(".pb") || name.ends_with(".bin") {
            ReportFormat::Binary
        } else {
            ReportFormat::Json
        }
    }
}

impl std::fmt::Display for ReportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportSource::Url(url) => f.write_str(url),
            ReportSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetch and decode a report
pub async fn fetch_report(source: &ReportSource) -> LoadResult<ReportData> {
    tracing::info!(source = %source, "loading report");
    let body = match source {
        ReportSource::Url(url) => fetch_url(url).await?,
        ReportSource::File(path) => read_file(path).await?,
    };
    let report = decode_report(&body, source.format())?;
    tracing::debug!(
        bytes = body.len(),
        screenshots = report
            .screenshots
            .as_ref()
            .map(|s| s.expected_screenshot_list.len())
            .unwrap_or(0),
        "report decoded"
    );
    Ok(report)
}

/// Decode a report body in the given format
pub fn decode_report(body: &[u8], format: ReportFormat) -> LoadResult<ReportData> {
    let report = match format {
        ReportFormat::Binary => ReportData::decode_bytes(body)?,
        ReportFormat::Json => ReportData::from_json_slice(body)?,
    };
    Ok(report)
}

async fn fetch_url(url: &str) -> LoadResult<Vec<u8>> {
    let transport = |source| LoadError::Transport {
        url: url.to_string(),
        source,
    };
    let response = reqwest::get(url).await.map_err(transport)?;
    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    let bytes = response.bytes().await.map_err(transport)?;
    Ok(bytes.to_vec())
}

async fn read_file(path: &Path) -> LoadResult<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_parse() {
        assert_eq!(
            ReportSource::parse("https://example.com/run/report.json"),
            ReportSource::Url("https://example.com/run/report.json".to_string())
        );
        assert_eq!(
            ReportSource::parse("out/report.json"),
            ReportSource::File(PathBuf::from("out/report.json"))
        );

        let dir = tempfile::tempdir().unwrap();
        let source = ReportSource::parse(dir.path().to_str().unwrap());
        assert_eq!(source, ReportSource::File(dir.path().join(REPORT_FILE_NAME)));
    }

    #[test]
    fn test_source_format() {
        assert_eq!(ReportSource::parse("report.pb").format(), ReportFormat::Binary);
        assert_eq!(
            ReportSource::parse("https://example.com/report.bin?x=1").format(),
            ReportFormat::Binary
        );
        assert_eq!(ReportSource::parse("report.json").format(), ReportFormat::Json);
    }

    #[test]
    fn test_decode_report_rejects_garbage() {
        assert!(matches!(
            decode_report(b"{not json", ReportFormat::Json),
            Err(LoadError::Schema(SchemaError::Json(_)))
        ));
        assert!(matches!(
            decode_report(&[0xff, 0xff, 0xff], ReportFormat::Binary),
            Err(LoadError::Schema(SchemaError::Decode(_)))
        ));
    }

    #[test]
    fn test_decode_report_invalid_utf8_is_json_error() {
        assert!(matches!(
            decode_report(b"\xff\xfe", ReportFormat::Json),
            Err(LoadError::Schema(SchemaError::Json(_)))
        ));
        // UTF-16 "{}" with a byte-order mark
        assert!(matches!(
            decode_report(b"\xff\xfe{\x00}\x00", ReportFormat::Json),
            Err(LoadError::Schema(SchemaError::Json(_)))
        ));
    }

    #[tokio::test]
    async fn test_fetch_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = ReportSource::File(dir.path().join("missing.json"));
        assert!(matches!(
            fetch_report(&source).await,
            Err(LoadError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_report_from_file_inside_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REPORT_FILE_NAME);
        tokio::fs::write(&path, b"{}").await.unwrap();
        let source = ReportSource::File(path);
        let missing_path = dir.path().join("missing.json");

        let (report, missing) = tokio::join!(fetch_report(&source), read_file(&missing_path));
        assert_eq!(report.unwrap(), ReportData::default());
        assert!(matches!(missing, Err(LoadError::Io { .. })));
    }
}
