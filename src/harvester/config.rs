//! Harvest configuration

use crate::fetcher::cnnvd_config::MAX_PAGE_SIZE;
use crate::fetcher::retry::DEFAULT_ATTEMPTS;
use crate::resume::checkpoint::DEFAULT_RERUN_DELAY_HOURS;
use chrono::Duration;
use std::path::PathBuf;

/// Settings for one harvest invocation
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Directory receiving records, snapshots and the checkpoint
    pub target_dir: PathBuf,
    /// Attempts per remote call
    pub retry_attempts: u32,
    /// Records requested per listing page
    pub page_size: u32,
    /// Expand every list entry to its full detail
    pub expand_details: bool,
    /// Write taxonomy snapshots before harvesting
    pub snapshot_taxonomies: bool,
    /// Delay until the next incremental run is due
    pub rerun_delay: Duration,
}

impl HarvestConfig {
    /// Defaults: 5 attempts, 50 records per page, details expanded,
    /// snapshots on, next run due after 24 hours
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: target_dir.into(),
            retry_attempts: DEFAULT_ATTEMPTS,
            page_size: MAX_PAGE_SIZE,
            expand_details: true,
            snapshot_taxonomies: true,
            rerun_delay: Duration::hours(DEFAULT_RERUN_DELAY_HOURS),
        }
    }

    /// Set the attempt budget per remote call
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    /// Set the listing page size
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Toggle detail expansion
    pub fn with_expand_details(mut self, expand: bool) -> Self {
        self.expand_details = expand;
        self
    }

    /// Toggle taxonomy snapshots
    pub fn with_snapshot_taxonomies(mut self, snapshot: bool) -> Self {
        self.snapshot_taxonomies = snapshot;
        self
    }

    /// Set the delay until the next incremental run
    pub fn with_rerun_delay(mut self, delay: Duration) -> Self {
        self.rerun_delay = delay;
        self
    }
}
