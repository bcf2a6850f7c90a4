use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use screenshot_report::approval::ApproveSelection;
use screenshot_report::config::{self, ENV_DIFF_THRESHOLD, ENV_GOLDEN_PATH, ENV_REPORT_SOURCE};
use screenshot_report::diff::compare_images;
use screenshot_report::loader::{ReportFormat, ReportSource, decode_report, fetch_report};
use screenshot_report::review::{ReportUi, render_lines, tui};
use screenshot_report::schema::{GoldenSuite, ReportData, ReportMessage};

/// Screenshot Report - review, approve and diff screenshot test runs
#[derive(Parser, Debug)]
#[command(
    name = "screenshot-report",
    version,
    about = "Review screenshot test reports and write approvals back to the golden file",
    after_help = "ENVIRONMENT VARIABLES:\n\
        SCREENSHOT_REPORT_SOURCE            Report URL, file or directory\n\
        SCREENSHOT_REPORT_GOLDEN_PATH       Golden file updated by approve\n\
        SCREENSHOT_REPORT_DIFF_THRESHOLD    Changed-pixel fraction threshold\n\
        SCREENSHOT_REPORT_APPROVE_SCRIPT    npm script for approve commands\n\
        SCREENSHOT_REPORT_TEST_SCRIPT       npm script for retry commands\n\
        RUST_LOG                            Log filter (logs go to stderr)"
)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Review a report interactively and build approve/retry commands
    Review {
        /// Report URL, file or directory
        #[arg(env = ENV_REPORT_SOURCE)]
        source: Option<String>,
    },

    /// Print the review tree without entering the terminal UI
    Show {
        /// Report URL, file or directory
        #[arg(env = ENV_REPORT_SOURCE)]
        source: Option<String>,

        /// Include image rows
        #[arg(long)]
        images: bool,

        /// Output the derived review state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Decode a report and check it: enum ranges, oneofs and index maps
    Verify {
        /// Report file (.json, or .pb/.bin for protobuf)
        file: PathBuf,
    },

    /// Convert a report between JSON and protobuf
    Convert {
        /// Input report file
        input: PathBuf,

        /// Output report file; a .pb/.bin extension selects protobuf
        output: PathBuf,
    },

    /// Apply approve flags to the golden file
    Approve {
        /// Golden file to update
        #[arg(long, env = ENV_GOLDEN_PATH)]
        golden: Option<PathBuf>,

        /// Resolve and print the approvals without saving
        #[arg(long)]
        dry_run: bool,

        /// Approve flags, e.g. --all-changed --added=a.html:chrome --report=<url>
        #[arg(last = true, allow_hyphen_values = true, required = true)]
        flags: Vec<String>,
    },

    /// Compare an expected and an actual screenshot
    Diff {
        expected: PathBuf,

        actual: PathBuf,

        /// Write a red overlay of the differences here
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Changed-pixel fraction above which the screenshot counts as changed
        #[arg(long, env = ENV_DIFF_THRESHOLD)]
        threshold: Option<f64>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn report_source(source: Option<String>) -> ReportSource {
    let source = source.unwrap_or_else(|| config::get().report_source.clone());
    ReportSource::parse(&source)
}

fn load_report(source: &ReportSource) -> Result<ReportData> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime
        .block_on(fetch_report(source))
        .with_context(|| format!("Failed to load report from {source}"))
}

fn format_of(path: &Path) -> ReportFormat {
    ReportSource::File(path.to_path_buf()).format()
}

fn read_report_file(path: &Path) -> Result<ReportData> {
    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    decode_report(&body, format_of(path)).with_context(|| format!("Invalid report {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Review { source } => {
            let source = report_source(source);
            let report = load_report(&source)?;
            let mut ui = ReportUi::from_report(report, config::get().scripts.clone());
            let last_command = tui::run(&mut ui)?;
            if let Some(command) = last_command {
                println!("{command}");
            }
        }

        Commands::Show {
            source,
            images,
            json,
        } => {
            let source = report_source(source);
            let report = load_report(&source)?;
            let mut ui = ReportUi::from_report(report, config::get().scripts.clone());
            if json {
                println!("{}", serde_json::to_string_pretty(ui.ui_state())?);
            } else {
                if images {
                    ui.collapse_none();
                }
                for line in render_lines(&ui) {
                    println!("{}", line.text);
                }
            }
        }

        Commands::Verify { file } => {
            let report = read_report_file(&file)?;
            if let Some(screenshots) = &report.screenshots {
                screenshots
                    .check_indexes()
                    .with_context(|| format!("Inconsistent index maps in {}", file.display()))?;
            }
            let count = report
                .screenshots
                .as_ref()
                .map(|s| s.expected_screenshot_list.len())
                .unwrap_or(0);
            println!("{}: ok ({count} expected screenshots)", file.display());
        }

        Commands::Convert { input, output } => {
            let report = read_report_file(&input)?;
            let body = match format_of(&output) {
                ReportFormat::Binary => report.encode_bytes(),
                ReportFormat::Json => {
                    let mut json = report.to_json_pretty()?;
                    json.push('\n');
                    json.into_bytes()
                }
            };
            fs::write(&output, body).with_context(|| format!("Failed to write {}", output.display()))?;
            tracing::info!(input = %input.display(), output = %output.display(), "report converted");
        }

        Commands::Approve {
            golden,
            dry_run,
            flags,
        } => {
            let selection = ApproveSelection::parse(&flags)?;
            let source = ReportSource::parse(selection.report_url()?);
            let report = load_report(&source)?;
            let approvals = selection.resolve(&report)?;

            if dry_run {
                println!("{}", approvals.to_json_pretty()?);
                return Ok(());
            }

            let golden_path = golden.unwrap_or_else(|| config::get().golden_path.clone());
            let mut suite = GoldenSuite::load(&golden_path)
                .with_context(|| format!("Failed to load {}", golden_path.display()))?;
            let touched = suite.apply_approvals(&approvals);
            suite
                .save(&golden_path)
                .with_context(|| format!("Failed to save {}", golden_path.display()))?;
            println!(
                "Approved {} screenshot(s); {touched} golden entries updated in {}",
                approvals.len(),
                golden_path.display()
            );
        }

        Commands::Diff {
            expected,
            actual,
            out,
            threshold,
        } => {
            let threshold = threshold.unwrap_or(config::get().diff_threshold);
            if !(0.0..=1.0).contains(&threshold) {
                bail!("Threshold must be between 0 and 1, got {threshold}");
            }
            let result = compare_images(&expected, &actual, out.as_deref(), threshold)?;
            println!("{}", result.to_json_pretty()?);
        }
    }

    Ok(())
}
