//! Fetch command: harvest records into a directory and optionally publish them

use super::{Cli, CliError};
use crate::harvester::{HarvestConfig, HarvestExecutor, HarvestMode, HarvestReport};
use crate::identifier::Window;
use crate::publish::{GitConfig, GitPublisher};
use chrono::Utc;
use clap::{ArgAction, Args};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::info;

/// Directory used when neither `--dir` nor a user cache directory is available
const FALLBACK_DIR: &str = "data";

/// Fetch command arguments
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Harvest mode: all, specific or increment
    #[arg(short = 't', long = "type", default_value = "all")]
    pub mode: String,

    /// Year to harvest with --type specific (default: current year)
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Month to harvest with --type specific; the current month selects the whole year
    #[arg(short, long)]
    pub month: Option<u32>,

    /// Target directory (default: <user cache dir>/cnnvd)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Expand every record to its full detail
    #[arg(short, long, default_value_t = true, action = ArgAction::Set)]
    pub complete: bool,

    /// Commit and push the target directory afterwards (see `CNNVD_URL`, `TOKEN`, ...)
    #[arg(short, long, default_value_t = true, action = ArgAction::Set)]
    pub github: bool,
}

impl FetchArgs {
    /// Execute the fetch command
    pub async fn execute(&self, cli: &Cli) -> Result<HarvestReport, CliError> {
        let now = Utc::now();
        let current = Window::containing(now);
        let mode = HarvestMode::from_args(
            &self.mode,
            self.year.unwrap_or(current.year),
            self.month.unwrap_or(current.month),
        )?;
        let target_dir = self.dir.clone().unwrap_or_else(default_target_dir);

        let config = HarvestConfig::new(&target_dir)
            .with_retry_attempts(cli.retry)
            .with_expand_details(self.complete);
        let executor =
            HarvestExecutor::new(cli.source()?, config).with_progress(create_progress_bar(cli.verbose));

        let report = executor.run(mode, now).await?;
        info!(
            mode = %report.mode,
            windows = report.windows,
            saved = report.records_saved,
            total = report.total_record_count,
            latest = %report.latest,
            dir = %target_dir.display(),
            "Fetch finished"
        );

        if self.github && report.due {
            let publisher = GitPublisher::new(GitConfig::from_env(&target_dir)?);
            publisher.publish(now).await?;
        }
        Ok(report)
    }
}

/// `<user cache dir>/cnnvd`, or `./data` when the platform has no cache dir
pub fn default_target_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.cache_dir().join("cnnvd"))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DIR))
}

/// Per-window record progress; hidden when logging verbosely
fn create_progress_bar(verbose: bool) -> ProgressBar {
    if verbose {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .expect("hardcoded template is valid")
            .progress_chars("#>-"),
    );
    pb
}
