//! Detail expansion of list entries
//!
//! Expansion is decided once per run: either every list entry is turned into
//! its full detail with one extra request, or every entry passes through
//! unchanged. A failed expansion aborts the run, so a harvested window is
//! never a mix of summaries and details.

use super::retry::RetryPolicy;
use super::{DetailRequest, FetcherResult, VulnSource};
use crate::{Record, VulnSummary};
use tracing::trace;

/// Turns list entries into persistable [`Record`]s
pub struct DetailExpander<'a, S: ?Sized> {
    source: &'a S,
    retry: RetryPolicy,
    expand: bool,
}

impl<'a, S: VulnSource + ?Sized> DetailExpander<'a, S> {
    /// Create an expander; `expand = false` passes summaries through
    pub fn new(source: &'a S, retry: RetryPolicy, expand: bool) -> Self {
        Self {
            source,
            retry,
            expand,
        }
    }

    /// Whether entries are expanded to their detail
    pub fn expands(&self) -> bool {
        self.expand
    }

    /// Resolve one list entry to the record that gets persisted
    pub async fn expand(&self, summary: VulnSummary) -> FetcherResult<Record> {
        if !self.expand {
            return Ok(Record::Summary(summary));
        }

        let request = DetailRequest::from(&summary);
        let operation = format!("detail {request}");
        let detail = self
            .retry
            .run(&operation, || self.source.detail(&request))
            .await?;
        trace!(cnnvd_code = %detail.cnnvd_code, "Expanded record detail");
        Ok(Record::Detail(detail))
    }
}
