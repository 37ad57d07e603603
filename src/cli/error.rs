//! CLI error types and conversions

use crate::fetcher::FetcherError;
use crate::harvester::{HarvestError, PlanError};
use crate::publish::PublishError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Mode or window arguments rejected
    #[error("plan error: {0}")]
    PlanError(#[from] PlanError),

    /// Harvest run failed
    #[error("harvest error: {0}")]
    HarvestError(#[from] HarvestError),

    /// Remote query failed
    #[error("fetcher error: {0}")]
    FetcherError(#[from] FetcherError),

    /// Git publishing failed
    #[error("publish error: {0}")]
    PublishError(#[from] PublishError),
}
