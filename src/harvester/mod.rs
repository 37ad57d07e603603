//! Harvest planning and orchestration
//!
//! A harvest runs in four steps:
//!
//! 1. **Planning**: [`planner::plan`] turns a [`HarvestMode`] and the checkpoint
//!    into an ordered list of year/month windows
//! 2. **Snapshots**: the taxonomy lookup tables are written next to the records
//! 3. **Windows**: each window is counted, walked page by page, optionally
//!    expanded to details and persisted one file per record
//! 4. **Checkpoint**: the running total and latest identifier are written once,
//!    after every window has completed
//!
//! # Quick Start
//!
//! ```no_run
//! use cnnvd_harvester::fetcher::cnnvd_http::CnnvdHttpClient;
//! use cnnvd_harvester::harvester::{HarvestConfig, HarvestExecutor, HarvestMode};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let source = CnnvdHttpClient::with_defaults()?;
//! let config = HarvestConfig::new("./cnnvd-data").with_expand_details(false);
//! let executor = HarvestExecutor::new(source, config);
//!
//! let mode = HarvestMode::Explicit { year: 2023, month: 4 };
//! let report = executor.run(mode, chrono::Utc::now()).await?;
//! println!("{} records in {} windows", report.records_saved, report.windows);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Every failure is fatal to the whole run and surfaces as a [`HarvestError`].
//! Nothing is skipped, and the checkpoint is only written after the last
//! window succeeded.

pub mod config;
pub mod executor;
pub mod planner;

pub use config::HarvestConfig;
pub use executor::{HarvestExecutor, HarvestReport};
pub use planner::{FeedPlan, HarvestMode};

use crate::fetcher::FetcherError;
use crate::identifier::IdentifierError;
use crate::output::OutputError;
use crate::resume::CheckpointError;

/// Planning errors
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Mode name is not one of `all`, `specific`, `increment`
    #[error("unsupported harvest mode: {0} (expected all, specific or increment)")]
    UnsupportedMode(String),

    /// Explicit year/month outside the database bounds
    #[error("invalid window: {0}")]
    InvalidWindow(#[from] IdentifierError),

    /// Checkpoint could not be initialized or read
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

/// Harvest run errors
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Planning failed
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Checkpoint store or run lock failed
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    /// Remote retrieval failed
    #[error(transparent)]
    Fetcher(#[from] FetcherError),

    /// Persisting a record or snapshot failed
    #[error(transparent)]
    Output(#[from] OutputError),
}
