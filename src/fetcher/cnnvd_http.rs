//! CNNVD HTTP client
//!
//! Provides the [`VulnSource`] implementation backed by the CNNVD web API:
//! - JSON POST request building for every endpoint
//! - Response envelope (`code` / `success` / `message` / `data`) unwrapping
//! - Error classification (network, HTTP status, API, parse)
//!
//! Each call is a single attempt; retries are layered on top by
//! [`super::RetryPolicy`].

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::cnnvd_config::CnnvdEndpoints;
use super::{
    DetailRequest, FetcherError, FetcherResult, ListPage, ListRequest, LookupKind, VulnSource,
};
use crate::{Taxonomy, VulnDetail, VulnSummary};

/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent with every request
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Response envelope shared by every CNNVD endpoint
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    fn into_data(self) -> FetcherResult<T> {
        if !self.success {
            return Err(FetcherError::ApiError(format!(
                "code {}: {}",
                self.code.map(|c| c.to_string()).unwrap_or_else(|| "?".to_string()),
                self.message.unwrap_or_else(|| "no message".to_string())
            )));
        }
        self.data
            .ok_or_else(|| FetcherError::InvalidResponse("response has no data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ListData {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    records: Vec<VulnSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailData {
    cnnvd_detail: VulnDetail,
}

/// HTTP client for the CNNVD web API
pub struct CnnvdHttpClient {
    client: Client,
    endpoints: CnnvdEndpoints,
}

impl CnnvdHttpClient {
    /// Create a client from an existing reqwest client and endpoint layout
    pub fn new(client: Client, endpoints: CnnvdEndpoints) -> Self {
        Self { client, endpoints }
    }

    /// Client for the public CNNVD site
    pub fn with_defaults() -> FetcherResult<Self> {
        Self::with_endpoints(CnnvdEndpoints::default())
    }

    /// Client with timeouts and user agent set, for the given endpoints
    pub fn with_endpoints(endpoints: CnnvdEndpoints) -> FetcherResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetcherError::HttpError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self::new(client, endpoints))
    }

    /// Endpoint layout in use
    pub fn endpoints(&self) -> &CnnvdEndpoints {
        &self.endpoints
    }

    /// POST a JSON body and unwrap the response envelope
    async fn post<T>(&self, endpoint: &str, body: &Value) -> FetcherResult<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoints.url(endpoint);
        debug!(url = %url, "POST request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| FetcherError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(FetcherError::HttpError(format!("Server error: {status}")));
        }
        if status.is_client_error() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FetcherError::HttpError(format!(
                "Client error {status}: {error_text}"
            )));
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| FetcherError::ParseError(format!("Failed to deserialize response: {e}")))?;
        envelope.into_data()
    }
}

/// JSON body of a listing request
fn list_body(request: &ListRequest) -> Value {
    json!({
        "pageIndex": request.page_index,
        "pageSize": request.page_size,
        "keyword": request.keyword,
        "hazardLevel": request.hazard_level.map(|level| level.to_string()).unwrap_or_default(),
        "vulType": "",
        "vendor": request.vendor.clone().unwrap_or_default(),
        "product": request.product.clone().unwrap_or_default(),
        "dateType": "",
    })
}

/// JSON body of a detail request
fn detail_body(request: &DetailRequest) -> Value {
    json!({
        "id": request.id,
        "vulType": request.vul_type,
        "cnnvdCode": request.cnnvd_code,
    })
}

/// JSON body of a lookup request
fn lookup_body(kind: LookupKind, keyword: Option<&str>) -> Value {
    let keyword = keyword.unwrap_or_default();
    match kind {
        LookupKind::Product => json!({ "productKeyword": keyword }),
        LookupKind::Vendor => json!({ "vendorKeyword": keyword }),
        LookupKind::HazardLevel | LookupKind::VulnType => json!({}),
    }
}

#[async_trait]
impl VulnSource for CnnvdHttpClient {
    async fn list(&self, request: &ListRequest) -> FetcherResult<ListPage> {
        let data: ListData = self
            .post(self.endpoints.list_endpoint, &list_body(request))
            .await?;
        Ok(ListPage {
            total: data.total,
            records: data.records,
        })
    }

    async fn detail(&self, request: &DetailRequest) -> FetcherResult<VulnDetail> {
        let data: DetailData = self
            .post(self.endpoints.detail_endpoint, &detail_body(request))
            .await?;
        Ok(data.cnnvd_detail)
    }

    async fn lookup(
        &self,
        kind: LookupKind,
        keyword: Option<&str>,
    ) -> FetcherResult<Vec<Taxonomy>> {
        self.post(self.endpoints.lookup_endpoint(kind), &lookup_body(kind, keyword))
            .await
    }
}
