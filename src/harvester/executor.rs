//! Harvest executor: drives planner, retriever, expander and sink

use super::planner::{self, HarvestMode};
use super::{HarvestConfig, HarvestError};
use crate::fetcher::cnnvd_config::FIRST_PAGE;
use crate::fetcher::{DetailExpander, LookupKind, PageWalker, RetryPolicy, VulnSource};
use crate::identifier::{CnnvdIdentifier, Window};
use crate::output::JsonRecordSink;
use crate::resume::{CheckpointStore, HarvestLock};
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestReport {
    /// Mode that was run
    pub mode: HarvestMode,
    /// False when an incremental run was not due and nothing was done
    pub due: bool,
    /// Windows harvested
    pub windows: usize,
    /// Records written during this run
    pub records_saved: u64,
    /// Running record count stored in the checkpoint
    pub total_record_count: u64,
    /// Latest identifier stored in the checkpoint
    pub latest: CnnvdIdentifier,
}

/// Accumulators owned by one run
#[derive(Debug)]
struct RunTally {
    total: u64,
    saved: u64,
    latest: CnnvdIdentifier,
}

impl RunTally {
    fn new(total: u64, latest: CnnvdIdentifier) -> Self {
        Self {
            total,
            saved: 0,
            latest,
        }
    }

    /// Count a persisted record and advance the latest identifier
    ///
    /// Later windows always win; within the same window the higher sequence does.
    fn observe(&mut self, identifier: &CnnvdIdentifier) {
        self.total += 1;
        self.saved += 1;
        let later_in_window = identifier.window() == self.latest.window()
            && identifier.sequence() > self.latest.sequence();
        if identifier.is_after(&self.latest) || later_in_window {
            self.latest = identifier.clone();
        }
    }
}

/// Runs harvests against one source and target directory
pub struct HarvestExecutor<S> {
    source: S,
    config: HarvestConfig,
    progress: ProgressBar,
}

impl<S: VulnSource> HarvestExecutor<S> {
    /// Create an executor; progress is hidden until [`with_progress`](Self::with_progress)
    pub fn new(source: S, config: HarvestConfig) -> Self {
        Self {
            source,
            config,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report per-window record progress on the given bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Run one harvest
    ///
    /// Rejects invalid explicit windows before anything is created on disk,
    /// then takes the run lock, plans the windows, writes the taxonomy snapshots,
    /// harvests every window in order and finally writes the checkpoint once.
    /// An incremental run that is not due returns immediately and leaves the
    /// checkpoint untouched.
    ///
    /// # Errors
    ///
    /// Any failure aborts the run; the checkpoint is not written in that case.
    pub async fn run(
        &self,
        mode: HarvestMode,
        now: DateTime<Utc>,
    ) -> Result<HarvestReport, HarvestError> {
        planner::validate(mode)?;

        let target_dir = &self.config.target_dir;
        let mut lock = HarvestLock::open(target_dir)?;
        let _guard = lock.try_exclusive()?;

        let store = CheckpointStore::new(target_dir).with_rerun_delay(self.config.rerun_delay);
        let plan = planner::plan(mode, &store, now)?;
        let mut tally = RunTally::new(plan.baseline.total_record_count(), plan.baseline_latest()?);

        if !plan.due {
            return Ok(HarvestReport {
                mode,
                due: false,
                windows: 0,
                records_saved: 0,
                total_record_count: tally.total,
                latest: tally.latest,
            });
        }

        info!(
            mode = %mode,
            target = %target_dir.display(),
            retry = self.config.retry_attempts,
            expand = self.config.expand_details,
            "Starting harvest"
        );

        let retry = RetryPolicy::new(self.config.retry_attempts);
        let sink = JsonRecordSink::new(target_dir.clone());

        if self.config.snapshot_taxonomies {
            self.snapshot_taxonomies(retry, &sink).await?;
        }

        let walker = PageWalker::new(&self.source, retry, self.config.page_size);
        let expander = DetailExpander::new(&self.source, retry, self.config.expand_details);
        for window in &plan.windows {
            self.harvest_window(&walker, &expander, &sink, *window, &mut tally)
                .await?;
        }
        self.progress.finish_and_clear();

        let checkpoint = store.write(tally.total, &tally.latest, now)?;

        info!(
            windows = plan.windows.len(),
            saved = tally.saved,
            total = checkpoint.total_record_count(),
            latest = %tally.latest,
            "Harvest complete"
        );
        Ok(HarvestReport {
            mode,
            due: true,
            windows: plan.windows.len(),
            records_saved: tally.saved,
            total_record_count: tally.total,
            latest: tally.latest,
        })
    }

    /// Write every lookup table to its snapshot file
    async fn snapshot_taxonomies(
        &self,
        retry: RetryPolicy,
        sink: &JsonRecordSink,
    ) -> Result<(), HarvestError> {
        for kind in LookupKind::ALL {
            let operation = format!("lookup {kind}");
            let values = retry
                .run(&operation, || self.source.lookup(kind, None))
                .await?;
            let path = sink.write_snapshot(kind.file_name(), &values)?;
            info!(
                kind = %kind,
                entries = values.len(),
                path = %path.display(),
                "Saved taxonomy snapshot"
            );
        }
        Ok(())
    }

    /// Harvest one window, folding every persisted record into the tally
    async fn harvest_window(
        &self,
        walker: &PageWalker<'_, S>,
        expander: &DetailExpander<'_, S>,
        sink: &JsonRecordSink,
        window: Window,
        tally: &mut RunTally,
    ) -> Result<u64, HarvestError> {
        let pages = walker.count_pages(&window).await?;
        if pages.is_empty() {
            debug!(window = %window, "Window holds no records");
            return Ok(0);
        }

        self.progress.set_length(pages.total_records);
        self.progress.set_position(0);
        self.progress.set_message(format!("CNNVD {window}"));

        let mut saved = 0u64;
        for page_index in FIRST_PAGE..=pages.page_count {
            for summary in walker.fetch_page(&window, page_index).await? {
                let record = expander.expand(summary).await?;
                let saved_record = sink.save(&record)?;
                tally.observe(&saved_record.identifier);
                saved += 1;
                self.progress.inc(1);
            }
        }

        if saved != pages.total_records {
            warn!(
                window = %window,
                declared = pages.total_records,
                saved,
                "Saved record count differs from declared total"
            );
        }
        info!(
            window = %window,
            pages = pages.page_count,
            saved,
            "Harvested window"
        );
        Ok(saved)
    }
}
