//! Paginated retrieval of the listing endpoint
//!
//! A window is walked in two steps:
//! - [`PageWalker::count_pages`] asks for the declared total and derives the page count
//! - [`PageWalker::fetch_page`] fetches pages `1..=page_count` in ascending order
//!
//! Every request goes through the walker's [`RetryPolicy`]. Pages are fetched
//! sequentially; the source's pagination and rate limits make fan-out unsafe.

use super::cnnvd_config::{FIRST_PAGE, MAX_PAGE_SIZE};
use super::retry::RetryPolicy;
use super::{FetcherError, FetcherResult, ListPage, ListRequest, VulnSource};
use crate::identifier::Window;
use crate::VulnSummary;
use tracing::debug;

/// Upper bound on pages per window, guards against a corrupt declared total
const MAX_PAGES: u32 = 10_000;

/// Page layout of one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    /// Pages to fetch (`ceil(total_records / page_size)`)
    pub page_count: u32,
    /// Records the source declares for the window
    pub total_records: u64,
}

impl PageInfo {
    /// Whether the window holds no records
    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }
}

/// Number of pages needed for `total` records
pub fn page_count(total: u64, page_size: u32) -> u64 {
    let page_size = u64::from(page_size.max(1));
    total.div_ceil(page_size)
}

/// Walks the pages of the listing endpoint with retry
pub struct PageWalker<'a, S: ?Sized> {
    source: &'a S,
    retry: RetryPolicy,
    page_size: u32,
}

impl<'a, S: VulnSource + ?Sized> PageWalker<'a, S> {
    /// Create a walker; `page_size` is clamped to `1..=MAX_PAGE_SIZE`
    pub fn new(source: &'a S, retry: RetryPolicy, page_size: u32) -> Self {
        Self {
            source,
            retry,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Page size in use
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Fetch one listing page with retry
    pub async fn fetch_list(&self, request: &ListRequest) -> FetcherResult<ListPage> {
        let operation = format!("list {request}");
        self.retry
            .run(&operation, || self.source.list(request))
            .await
    }

    /// Determine the declared total and page count of a window
    pub async fn count_pages(&self, window: &Window) -> FetcherResult<PageInfo> {
        let request = ListRequest::page(window.keyword(), FIRST_PAGE, self.page_size);
        let page = self.fetch_list(&request).await?;

        let pages = page_count(page.total, self.page_size);
        if pages > u64::from(MAX_PAGES) {
            return Err(FetcherError::InvalidResponse(format!(
                "window {window} declares {} records ({pages} pages, max {MAX_PAGES})",
                page.total
            )));
        }

        debug!(
            window = %window,
            total = page.total,
            pages,
            page_size = self.page_size,
            "Counted pages"
        );
        Ok(PageInfo {
            page_count: pages as u32,
            total_records: page.total,
        })
    }

    /// Fetch the records of one page of a window (1-based index)
    pub async fn fetch_page(
        &self,
        window: &Window,
        page_index: u32,
    ) -> FetcherResult<Vec<VulnSummary>> {
        let request = ListRequest::page(window.keyword(), page_index, self.page_size);
        let page = self.fetch_list(&request).await?;
        debug!(
            window = %window,
            page = page_index,
            records = page.records.len(),
            "Fetched page"
        );
        Ok(page.records)
    }
}
