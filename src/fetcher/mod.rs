//! Remote source access
//!
//! [`VulnSource`] is the seam between the harvest engine and the CNNVD web
//! API. [`cnnvd_http::CnnvdHttpClient`] talks to the real service; tests plug
//! in an in-memory source.

use crate::{Taxonomy, VulnDetail, VulnSummary};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

pub mod cnnvd_config;
pub mod cnnvd_http;
pub mod expander;
pub mod pagination;
pub mod retry;

pub use expander::DetailExpander;
pub use pagination::{PageInfo, PageWalker};
pub use retry::RetryPolicy;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network error
    #[error("network error: {0}")]
    NetworkError(String),

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// API error response (`success: false`)
    #[error("API error: {0}")]
    ApiError(String),

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Every attempt of an operation failed
    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    RetrievalExhausted {
        /// Operation with its request parameters
        operation: String,
        /// Attempts made
        attempts: u32,
        /// Error of the last attempt
        #[source]
        source: Box<FetcherError>,
    },
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Listing endpoint request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// 1-based page index
    pub page_index: u32,
    /// Records per page
    pub page_size: u32,
    /// Window keyword (`CNNVD-YYYYMM`) or free-text search term
    pub keyword: String,
    /// Hazard level code filter
    pub hazard_level: Option<u8>,
    /// Vendor filter (lookup value)
    pub vendor: Option<String>,
    /// Product filter (lookup value)
    pub product: Option<String>,
}

impl ListRequest {
    /// Request for one page of a keyword with no extra filters
    pub fn page(keyword: impl Into<String>, page_index: u32, page_size: u32) -> Self {
        Self {
            page_index,
            page_size,
            keyword: keyword.into(),
            hazard_level: None,
            vendor: None,
            product: None,
        }
    }
}

impl fmt::Display for ListRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "keyword={} page={} size={}",
            self.keyword, self.page_index, self.page_size
        )?;
        if let Some(level) = self.hazard_level {
            write!(f, " hazard_level={level}")?;
        }
        if let Some(vendor) = &self.vendor {
            write!(f, " vendor={vendor}")?;
        }
        if let Some(product) = &self.product {
            write!(f, " product={product}")?;
        }
        Ok(())
    }
}

/// One page of the listing endpoint
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListPage {
    /// Total records matching the query (across all pages)
    pub total: u64,
    /// Records on this page
    pub records: Vec<VulnSummary>,
}

/// Detail endpoint request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    /// Internal record id
    pub id: String,
    /// Vulnerability type code
    pub vul_type: String,
    /// CNNVD identifier string
    pub cnnvd_code: String,
}

impl From<&VulnSummary> for DetailRequest {
    fn from(summary: &VulnSummary) -> Self {
        Self {
            id: summary.id.clone(),
            vul_type: summary.vul_type.clone(),
            cnnvd_code: summary.cnnvd_code.clone(),
        }
    }
}

impl fmt::Display for DetailRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={} vul_type={} cnnvd_code={}",
            self.id, self.vul_type, self.cnnvd_code
        )
    }
}

/// Lookup (taxonomy) endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    /// Hazard levels
    HazardLevel,
    /// Affected products
    Product,
    /// Affected vendors
    Vendor,
    /// Vulnerability types
    VulnType,
}

impl LookupKind {
    /// All lookups, in snapshot order
    pub const ALL: [LookupKind; 4] = [
        LookupKind::HazardLevel,
        LookupKind::Product,
        LookupKind::Vendor,
        LookupKind::VulnType,
    ];

    /// Snapshot file name in the target directory
    pub fn file_name(&self) -> &'static str {
        match self {
            LookupKind::HazardLevel => "hazard_level.json",
            LookupKind::Product => "product.json",
            LookupKind::Vendor => "vendor.json",
            LookupKind::VulnType => "vuln_type.json",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LookupKind::HazardLevel => "hazard level",
            LookupKind::Product => "product",
            LookupKind::Vendor => "vendor",
            LookupKind::VulnType => "vuln type",
        };
        write!(f, "{s}")
    }
}

/// Remote vulnerability database
///
/// Each method performs exactly one request; retrying is the caller's job
/// (see [`RetryPolicy`]).
#[async_trait]
pub trait VulnSource: Send + Sync {
    /// Fetch one page of the listing endpoint
    async fn list(&self, request: &ListRequest) -> FetcherResult<ListPage>;

    /// Fetch the full detail of one record
    async fn detail(&self, request: &DetailRequest) -> FetcherResult<VulnDetail>;

    /// Fetch a lookup table, optionally filtered by keyword
    async fn lookup(&self, kind: LookupKind, keyword: Option<&str>)
        -> FetcherResult<Vec<Taxonomy>>;
}

#[async_trait]
impl<T: VulnSource + ?Sized> VulnSource for Arc<T> {
    async fn list(&self, request: &ListRequest) -> FetcherResult<ListPage> {
        (**self).list(request).await
    }

    async fn detail(&self, request: &DetailRequest) -> FetcherResult<VulnDetail> {
        (**self).detail(request).await
    }

    async fn lookup(
        &self,
        kind: LookupKind,
        keyword: Option<&str>,
    ) -> FetcherResult<Vec<Taxonomy>> {
        (**self).lookup(kind, keyword).await
    }
}
