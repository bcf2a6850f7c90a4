//! Configuration management with environment variable support.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SCREENSHOT_REPORT_SOURCE` | Report URL, file or directory | `./report.json` |
//! | `SCREENSHOT_REPORT_GOLDEN_PATH` | Golden file updated by `approve` | `test/screenshot/golden.json` |
//! | `SCREENSHOT_REPORT_DIFF_THRESHOLD` | Pixel fraction above which a diff counts as changed | `0.0001` |
//! | `SCREENSHOT_REPORT_APPROVE_SCRIPT` | npm script for approve commands | `screenshot:approve` |
//! | `SCREENSHOT_REPORT_TEST_SCRIPT` | npm script for retry commands | `screenshot:test` |
//!
//! # Example
//!
//! ```bash
//! export SCREENSHOT_REPORT_SOURCE="https://storage.example.com/run-42/report.json"
//! export SCREENSHOT_REPORT_GOLDEN_PATH="screenshots/golden.json"
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

// ============================================================================
// Default Values
// ============================================================================

/// Default report location
pub const DEFAULT_REPORT_SOURCE: &str = "./report.json";

/// Default golden file path
pub const DEFAULT_GOLDEN_PATH: &str = "test/screenshot/golden.json";

/// Default changed-pixel fraction threshold
pub const DEFAULT_DIFF_THRESHOLD: f64 = 0.0001;

/// Default npm script used for approvals
pub const DEFAULT_APPROVE_SCRIPT: &str = "screenshot:approve";

/// Default npm script used for retries
pub const DEFAULT_TEST_SCRIPT: &str = "screenshot:test";

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_REPORT_SOURCE: &str = "SCREENSHOT_REPORT_SOURCE";

pub const ENV_GOLDEN_PATH: &str = "SCREENSHOT_REPORT_GOLDEN_PATH";

pub const ENV_DIFF_THRESHOLD: &str = "SCREENSHOT_REPORT_DIFF_THRESHOLD";

pub const ENV_APPROVE_SCRIPT: &str = "SCREENSHOT_REPORT_APPROVE_SCRIPT";

pub const ENV_TEST_SCRIPT: &str = "SCREENSHOT_REPORT_TEST_SCRIPT";

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Where `report.json` is loaded from
    pub report_source: String,
    /// Golden file updated by approvals
    pub golden_path: PathBuf,
    /// Changed-pixel fraction above which a screenshot counts as changed
    pub diff_threshold: f64,
    /// Script names used when building CLI commands
    pub scripts: ScriptSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSettings {
    pub approve: String,
    pub test: String,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self::from_lookup(|_| None)
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            report_source: lookup(ENV_REPORT_SOURCE)
                .unwrap_or_else(|| DEFAULT_REPORT_SOURCE.to_string()),
            golden_path: lookup(ENV_GOLDEN_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_GOLDEN_PATH)),
            diff_threshold: lookup(ENV_DIFF_THRESHOLD)
                .and_then(|s| parse_threshold(&s))
                .unwrap_or(DEFAULT_DIFF_THRESHOLD),
            scripts: ScriptSettings {
                approve: lookup(ENV_APPROVE_SCRIPT)
                    .unwrap_or_else(|| DEFAULT_APPROVE_SCRIPT.to_string()),
                test: lookup(ENV_TEST_SCRIPT).unwrap_or_else(|| DEFAULT_TEST_SCRIPT.to_string()),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl Default for ScriptSettings {
    fn default() -> Self {
        get().scripts.clone()
    }
}

/// Parse a threshold; only fractions in 0..=1 are accepted
fn parse_threshold(value: &str) -> Option<f64> {
    let threshold: f64 = value.trim().parse().ok()?;
    (0.0..=1.0).contains(&threshold).then_some(threshold)
}
