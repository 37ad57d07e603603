//! CNNVD endpoint configuration
//!
//! Keeps the base URL and every endpoint path in one struct so the HTTP
//! client can be pointed at a mirror or a local test server.

use super::LookupKind;

/// Largest page size the listing endpoint accepts
pub const MAX_PAGE_SIZE: u32 = 50;

/// First page index of the listing endpoint
pub const FIRST_PAGE: u32 = 1;

/// Endpoint layout of the CNNVD web API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnnvdEndpoints {
    /// Base URL (e.g., <https://www.cnnvd.org.cn>)
    pub base_url: String,

    /// Paginated vulnerability listing
    pub list_endpoint: &'static str,

    /// Per-record detail
    pub detail_endpoint: &'static str,

    /// Hazard level lookup
    pub hazard_level_endpoint: &'static str,

    /// Product lookup
    pub product_endpoint: &'static str,

    /// Vendor lookup
    pub vendor_endpoint: &'static str,

    /// Vulnerability type lookup
    pub vuln_type_endpoint: &'static str,
}

/// Default public base URL
pub const DEFAULT_BASE_URL: &str = "https://www.cnnvd.org.cn";

impl Default for CnnvdEndpoints {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            list_endpoint: "/web/homePage/cnnvdVulList",
            detail_endpoint: "/web/cnnvdVul/getCnnnvdDetailOnDatasource",
            hazard_level_endpoint: "/web/homePage/getHazardLevelList",
            product_endpoint: "/web/homePage/getProductList",
            vendor_endpoint: "/web/homePage/getVendorList",
            vuln_type_endpoint: "/web/homePage/getVulTypeList",
        }
    }
}

impl CnnvdEndpoints {
    /// Default endpoints under a different base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Path of a lookup endpoint
    pub fn lookup_endpoint(&self, kind: LookupKind) -> &'static str {
        match kind {
            LookupKind::HazardLevel => self.hazard_level_endpoint,
            LookupKind::Product => self.product_endpoint,
            LookupKind::Vendor => self.vendor_endpoint,
            LookupKind::VulnType => self.vuln_type_endpoint,
        }
    }

    /// Full URL of an endpoint path
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }
}
